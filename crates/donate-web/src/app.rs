//! Main App Component
//!
//! Owns the page's `SessionSlot` and mirrors the session's `ModalView` into a
//! signal the components render from.

use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;

use donate_core::{
    Decimal, DonateConfig, DonationSession, DonorField, Frequency, ModalView, SessionSlot,
    SessionStatus,
};
use donate_runtime::HttpDonationBackend;

use crate::clock::BrowserClock;
use crate::config::web_config;
use crate::pages::DonatePage;
use crate::stripe::StripeJsLoader;

/// Handles the modal components share through context
#[derive(Clone, Copy)]
pub struct ModalContext {
    /// Latest snapshot pushed by the session
    pub view: RwSignal<ModalView>,

    /// Session could not be created
    pub setup_error: RwSignal<Option<String>>,

    pub config: StoredValue<DonateConfig>,

    slot: StoredValue<SessionSlot, LocalStorage>,
}

impl ModalContext {
    fn session(self) -> Option<DonationSession> {
        self.slot.with_value(SessionSlot::get)
    }

    /// Open the modal, creating the session on first use
    pub fn open(self) {
        let session = match self.slot.with_value(SessionSlot::get_or_create) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Could not start donation session");
                self.setup_error.set(Some(e.user_message()));
                return;
            }
        };
        self.setup_error.set(None);

        spawn_local(async move {
            session.open().await;
            if session.status() == SessionStatus::Open {
                focus_element("mbxFirstName");
            }
        });
    }

    pub fn close(self) {
        if let Some(session) = self.session() {
            session.close();
        }
    }

    pub fn select_amount(self, value: Decimal) {
        if let Some(session) = self.session() {
            session.select_amount(value);
        }
    }

    pub fn select_custom_amount(self, raw: &str) {
        if let Some(session) = self.session() {
            session.select_custom_amount(raw);
        }
    }

    pub fn set_frequency(self, frequency: Frequency) {
        if let Some(session) = self.session() {
            session.set_frequency(frequency);
        }
    }

    pub fn set_field(self, field: DonorField, value: &str) {
        if let Some(session) = self.session() {
            session.set_field(field, value);
        }
    }

    pub fn submit(self) {
        if let Some(session) = self.session() {
            spawn_local(async move {
                let outcome = session.submit().await;
                tracing::debug!(?outcome, "Submit finished");
            });
        }
    }

    pub fn dismiss_failure(self) {
        if let Some(session) = self.session() {
            session.dismiss_failure();
        }
    }
}

fn focus_element(id: &str) {
    use wasm_bindgen::JsCast;

    if let Some(element) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(id))
        .and_then(|e| e.dyn_into::<web_sys::HtmlElement>().ok())
    {
        let _ = element.focus();
    }
}

/// Session factory wired to Stripe.js, the HTTP backend and browser timers
fn session_slot(config: DonateConfig, view: RwSignal<ModalView>) -> SessionSlot {
    SessionSlot::new(move || {
        let backend = HttpDonationBackend::from_config(&config)?;
        let session = DonationSession::new(
            config.clone(),
            Rc::new(StripeJsLoader::new(config.publishable_key.clone())),
            Rc::new(backend),
            Rc::new(BrowserClock),
        )?;
        session.set_observer(move |snapshot| view.set(snapshot.clone()));
        Ok(session)
    })
}

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    let setup_error = RwSignal::new(None::<String>);

    let config = web_config().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid build configuration, using defaults");
        setup_error.set(Some(e.user_message()));
        DonateConfig::default()
    });

    let view_state = RwSignal::new(ModalView::closed(&config));
    let slot = StoredValue::new_local(session_slot(config.clone(), view_state));

    provide_context(ModalContext {
        view: view_state,
        setup_error,
        config: StoredValue::new(config),
        slot,
    });

    view! {
        <main class="app">
            <DonatePage />
        </main>
    }
}
