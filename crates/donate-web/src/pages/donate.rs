//! Donate Page

use leptos::prelude::*;

use crate::app::ModalContext;
use crate::components::DonateModal;

#[component]
pub fn DonatePage() -> impl IntoView {
    let ctx = expect_context::<ModalContext>();
    let setup_error = move || ctx.setup_error.get();

    view! {
        <div class="donate">
            <header class="hero">
                <h1>"Support Our Mission"</h1>
                <p class="tagline">"Every gift goes straight to the programs you choose."</p>
                <div class="cta">
                    <button class="btn btn-primary" on:click=move |_| ctx.open()>
                        "Donate"
                    </button>
                </div>
                <Show when=move || setup_error().is_some()>
                    <p class="error" role="alert">{move || setup_error().unwrap_or_default()}</p>
                </Show>
            </header>

            <DonateModal />
        </div>
    }
}
