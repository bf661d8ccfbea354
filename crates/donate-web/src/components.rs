//! UI Components

use leptos::ev;
use leptos::prelude::*;

use donate_core::{Decimal, DonorField, Frequency};

use crate::app::ModalContext;

/// `$250`, `$12.50`, `€40`, `150 SEK`
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let amount = if amount.fract().is_zero() {
        amount.trunc().to_string()
    } else {
        format!("{:.2}", amount.round_dp(2))
    };
    match currency.to_lowercase().as_str() {
        "usd" | "cad" | "aud" => format!("${amount}"),
        "eur" => format!("€{amount}"),
        "gbp" => format!("£{amount}"),
        other => format!("{amount} {}", other.to_uppercase()),
    }
}

fn use_modal() -> ModalContext {
    expect_context::<ModalContext>()
}

/// The donate dialog: backdrop, amount and frequency pickers, donor fields,
/// card slot and submit control.
#[component]
pub fn DonateModal() -> impl IntoView {
    let ctx = use_modal();
    let visible = move || ctx.view.with(|v| v.visible);

    // Page scroll follows the session
    Effect::new(move |_| {
        let locked = ctx.view.with(|v| v.scroll_locked);
        if let Some(body) = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.body())
        {
            let _ = body
                .style()
                .set_property("overflow", if locked { "hidden" } else { "" });
        }
    });

    // Escape closes an open modal
    let escape = window_event_listener(ev::keydown, move |event| {
        if event.key() == "Escape" && ctx.view.with_untracked(|v| v.visible) {
            ctx.close();
        }
    });
    on_cleanup(move || escape.remove());

    let card_slot_id = ctx
        .config
        .with_value(|c| c.card_slot.trim_start_matches('#').to_string());

    view! {
        <div
            id="mbxModalBackdrop"
            class="mbx-modal-backdrop"
            class:active=visible
            aria-hidden=move || if visible() { "false" } else { "true" }
            on:click=move |event| {
                if event.target() == event.current_target() {
                    ctx.close();
                }
            }
        >
            <div class="mbx-modal" role="dialog" aria-modal="true" aria-labelledby="mbxTitle">
                <button class="mbx-close" aria-label="Close" on:click=move |_| ctx.close()>
                    "×"
                </button>
                <h2 id="mbxTitle">"Make a Donation"</h2>

                <WarningNotice />
                <AmountPicker />
                <FrequencyToggle />
                <DonorFields />

                <div class="mbx-form-group">
                    <label for=card_slot_id.clone()>"Card Details"</label>
                    <div id=card_slot_id class="mbx-card-element"></div>
                    <CardError />
                </div>

                <FailureNotice />
                <SubmitButton />
                <SuccessBanner />
            </div>
        </div>
    }
}

#[component]
fn WarningNotice() -> impl IntoView {
    let ctx = use_modal();
    let warning = move || ctx.view.with(|v| v.warning.clone());

    view! {
        <Show when=move || warning().is_some()>
            <div class="mbx-warning" role="status">
                {move || warning().unwrap_or_default()}
            </div>
        </Show>
    }
}

#[component]
fn AmountPicker() -> impl IntoView {
    let ctx = use_modal();
    let (presets, currency) = ctx
        .config
        .with_value(|c| (c.presets.clone(), c.currency.clone()));

    let buttons = presets
        .into_iter()
        .map(|preset| {
            let label = format_amount(preset, &currency);
            view! {
                <button
                    type="button"
                    class="mbx-amount-btn"
                    class:selected=move || ctx.view.with(|v| v.amount.is_preset(preset))
                    on:click=move |_| ctx.select_amount(preset)
                >
                    {label}
                </button>
            }
        })
        .collect_view();

    view! {
        <div class="mbx-amounts">
            {buttons}
            <input
                type="text"
                inputmode="decimal"
                class="mbx-custom-amount"
                class:selected=move || ctx.view.with(|v| v.amount.is_custom())
                placeholder="Other amount"
                aria-label="Custom amount"
                prop:value=move || ctx.view.with(|v| v.custom_input.clone())
                on:input=move |event| ctx.select_custom_amount(&event_target_value(&event))
            />
        </div>
    }
}

#[component]
fn FrequencyToggle() -> impl IntoView {
    let ctx = use_modal();
    let is = move |frequency: Frequency| ctx.view.with(|v| v.frequency == frequency);

    view! {
        <div class="mbx-frequency" role="group" aria-label="Donation frequency">
            <button
                type="button"
                class="mbx-frequency-btn"
                class:active=move || is(Frequency::OneTime)
                on:click=move |_| ctx.set_frequency(Frequency::OneTime)
            >
                "One-time"
            </button>
            <button
                type="button"
                class="mbx-frequency-btn"
                class:active=move || is(Frequency::Monthly)
                on:click=move |_| ctx.set_frequency(Frequency::Monthly)
            >
                "Monthly"
            </button>
        </div>
    }
}

#[component]
fn DonorFields() -> impl IntoView {
    let ctx = use_modal();

    view! {
        <div class="mbx-donor">
            <TextField
                id="mbxFirstName"
                label="First Name"
                field=DonorField::FirstName
                error="First name is required"
            />
            <TextField
                id="mbxLastName"
                label="Last Name"
                field=DonorField::LastName
                error="Last name is required"
            />
            <TextField
                id="mbxEmail"
                label="Email"
                field=DonorField::Email
                error="Please enter a valid email"
                input_type="email"
            />
            <div class="mbx-form-group">
                <label for="mbxDesignation">"Designation (optional)"</label>
                <input
                    id="mbxDesignation"
                    type="text"
                    class="mbx-form-input"
                    placeholder="general"
                    prop:value=move || ctx.view.with(|v| v.form.designation.clone())
                    on:input=move |event| {
                        ctx.set_field(DonorField::Designation, &event_target_value(&event));
                    }
                />
            </div>
        </div>
    }
}

#[component]
fn TextField(
    id: &'static str,
    label: &'static str,
    field: DonorField,
    error: &'static str,
    #[prop(default = "text")] input_type: &'static str,
) -> impl IntoView {
    let ctx = use_modal();
    let value = move || {
        ctx.view.with(|v| match field {
            DonorField::FirstName => v.form.first_name.clone(),
            DonorField::LastName => v.form.last_name.clone(),
            DonorField::Email => v.form.email.clone(),
            DonorField::Designation => v.form.designation.clone(),
        })
    };
    let failed = move || {
        ctx.view.with(|v| match field {
            DonorField::FirstName => v.field_errors.first_name,
            DonorField::LastName => v.field_errors.last_name,
            DonorField::Email => v.field_errors.email,
            DonorField::Designation => false,
        })
    };
    let error_id = format!("{id}Err");

    view! {
        <div class="mbx-form-group">
            <label for=id>{label}</label>
            <input
                id=id
                type=input_type
                class="mbx-form-input"
                aria-invalid=move || if failed() { "true" } else { "false" }
                aria-describedby=error_id.clone()
                prop:value=value
                on:input=move |event| ctx.set_field(field, &event_target_value(&event))
            />
            <div id=error_id class="mbx-error" class:show=failed>
                {error}
            </div>
        </div>
    }
}

#[component]
fn CardError() -> impl IntoView {
    let ctx = use_modal();
    let message = move || ctx.view.with(|v| v.card_error.clone());

    view! {
        <div id="mbxCardErr" class="mbx-error" class:show=move || message().is_some() role="alert">
            {move || message().unwrap_or_default()}
        </div>
    }
}

#[component]
fn FailureNotice() -> impl IntoView {
    let ctx = use_modal();
    let failure = move || ctx.view.with(|v| v.failure.clone());

    view! {
        <Show when=move || failure().is_some()>
            <div class="mbx-failure" role="alert">
                <span>{move || failure().unwrap_or_default()}</span>
                <button type="button" class="mbx-dismiss" on:click=move |_| ctx.dismiss_failure()>
                    "Dismiss"
                </button>
            </div>
        </Show>
    }
}

#[component]
fn SubmitButton() -> impl IntoView {
    let ctx = use_modal();
    let currency = ctx.config.with_value(|c| c.currency.clone());
    let loading = move || ctx.view.with(|v| v.loading);
    let label = move || {
        ctx.view.with(|v| {
            let amount = format_amount(v.amount_value(), &currency);
            match v.frequency {
                Frequency::OneTime => format!("Donate {amount}"),
                Frequency::Monthly => format!("Donate {amount}/month"),
            }
        })
    };

    view! {
        <button
            type="button"
            class="mbx-donate-submit"
            prop:disabled=move || !ctx.view.with(|v| v.submit_enabled)
            on:click=move |_| ctx.submit()
        >
            <span class="mbx-submit-text" style:display=move || if loading() { "none" } else { "inline" }>
                {label}
            </span>
            <span id="mbxLoading" class="mbx-loading" class:active=loading aria-live="polite">
                "Processing..."
            </span>
        </button>
    }
}

#[component]
fn SuccessBanner() -> impl IntoView {
    let ctx = use_modal();

    view! {
        <div
            id="mbxSuccessMsg"
            class="mbx-success"
            class:show=move || ctx.view.with(|v| v.success_visible)
            role="status"
        >
            "Thank you! Your donation was received."
        </div>
    }
}
