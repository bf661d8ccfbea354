//! Stripe.js Payment Provider
//!
//! `PaymentProvider` over Stripe Elements. Results coming back from Stripe.js
//! are stringified and decoded with serde so the decoding stays testable off
//! the browser.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use async_trait::async_trait;
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlScriptElement;

use donate_core::{
    error::{DonateError, Result},
    provider::{CardChangeListener, ConfirmDetails, PaymentStatus},
    CardChange, CardInputHandle, ClientSecret, PaymentProvider, PaymentResult, ProviderLoader,
};

use crate::bindings::{self, CardElement, Elements, Stripe};

/// Stripe.js v3 script
pub const STRIPE_JS_URL: &str = "https://js.stripe.com/v3/";

// ============================================================================
// Loader
// ============================================================================

/// Loads Stripe.js on first use and builds the provider
pub struct StripeJsLoader {
    publishable_key: String,
    script_url: String,
}

impl StripeJsLoader {
    pub fn new(publishable_key: impl Into<String>) -> Self {
        Self {
            publishable_key: publishable_key.into(),
            script_url: STRIPE_JS_URL.into(),
        }
    }
}

#[async_trait(?Send)]
impl ProviderLoader for StripeJsLoader {
    async fn load(&self) -> Result<Rc<dyn PaymentProvider>> {
        if self.publishable_key.trim().is_empty() {
            return Err(DonateError::ProviderUnavailable(
                "publishable key not configured".into(),
            ));
        }

        if !bindings::stripe_loaded() {
            tracing::debug!(url = %self.script_url, "Loading Stripe.js");
            load_script(&self.script_url).await.map_err(|e| {
                DonateError::ProviderUnavailable(format!(
                    "Stripe.js failed to load: {}",
                    describe_js_error(&e)
                ))
            })?;
        }

        let provider: Rc<dyn PaymentProvider> =
            Rc::new(StripeJsProvider::new(&self.publishable_key)?);
        tracing::info!("✓ Stripe.js ready");
        Ok(provider)
    }
}

/// Append a `<script>` to `<head>` and wait for it to load
async fn load_script(src: &str) -> std::result::Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("no <head>"))?;

    let script: HtmlScriptElement = document.create_element("script")?.dyn_into()?;
    script.set_src(src);
    script.set_async(true);

    let loaded = js_sys::Promise::new(&mut |resolve, reject| {
        script.set_onload(Some(&resolve));
        script.set_onerror(Some(&reject));
    });
    head.append_child(&script)?;

    JsFuture::from(loaded).await.map(|_| ())
}

// ============================================================================
// Provider
// ============================================================================

/// Stripe Elements card input plus `confirmCardPayment`
pub struct StripeJsProvider {
    stripe: Stripe,
    elements: Elements,
    cards: RefCell<HashMap<u64, CardElement>>,
    listeners: RefCell<Vec<Closure<dyn Fn(JsValue)>>>,
    next_id: Cell<u64>,
}

impl StripeJsProvider {
    pub fn new(publishable_key: &str) -> Result<Self> {
        let stripe = bindings::create_stripe(publishable_key).map_err(|e| {
            DonateError::ProviderUnavailable(format!("Stripe(): {}", describe_js_error(&e)))
        })?;
        let elements = stripe.elements().map_err(|e| {
            DonateError::ProviderUnavailable(format!("elements(): {}", describe_js_error(&e)))
        })?;

        Ok(Self {
            stripe,
            elements,
            cards: RefCell::new(HashMap::new()),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        })
    }

    fn card(&self, handle: &CardInputHandle) -> Result<CardElement> {
        self.cards
            .borrow()
            .get(&handle.id())
            .cloned()
            .ok_or_else(|| DonateError::CardInput(format!("unknown card input {}", handle.id())))
    }
}

#[async_trait(?Send)]
impl PaymentProvider for StripeJsProvider {
    fn name(&self) -> &str {
        "stripe-js"
    }

    fn create_card_input(&self) -> Result<CardInputHandle> {
        let element = self
            .elements
            .create("card", &js_sys::Object::new())
            .map_err(|e| DonateError::CardInput(describe_js_error(&e)))?;

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.cards.borrow_mut().insert(id, element);
        Ok(CardInputHandle::new(id))
    }

    fn mount_card_input(
        &self,
        card: &CardInputHandle,
        slot: &str,
        listener: CardChangeListener,
    ) -> Result<()> {
        let element = self.card(card)?;
        element
            .mount(slot)
            .map_err(|e| DonateError::CardInput(describe_js_error(&e)))?;

        let on_change = Closure::<dyn Fn(JsValue)>::new(move |event: JsValue| {
            listener(card_change_from_js(&event));
        });
        element.on("change", on_change.as_ref().unchecked_ref());
        self.listeners.borrow_mut().push(on_change);
        Ok(())
    }

    fn clear_card_input(&self, card: &CardInputHandle) {
        if let Ok(element) = self.card(card) {
            element.clear();
        }
    }

    async fn confirm_payment(
        &self,
        secret: &ClientSecret,
        details: &ConfirmDetails,
    ) -> Result<PaymentResult> {
        let element = self.card(&details.card)?;
        let data = confirm_data(&element, details)
            .map_err(|e| DonateError::Provider(describe_js_error(&e)))?;

        let promise = self.stripe.confirm_card_payment(secret.expose(), &data);
        let resolved = JsFuture::from(promise)
            .await
            .map_err(|e| DonateError::Provider(describe_js_error(&e)))?;

        let json = js_sys::JSON::stringify(&resolved)
            .map_err(|e| DonateError::MalformedResponse(describe_js_error(&e)))?;
        parse_confirm_response(&String::from(json))
    }
}

/// `{payment_method: {card, billing_details: {name, email}}}`
fn confirm_data(card: &CardElement, details: &ConfirmDetails) -> std::result::Result<JsValue, JsValue> {
    let billing = js_sys::Object::new();
    js_sys::Reflect::set(&billing, &"name".into(), &details.billing_name.as_str().into())?;
    js_sys::Reflect::set(&billing, &"email".into(), &details.billing_email.as_str().into())?;

    let payment_method = js_sys::Object::new();
    js_sys::Reflect::set(&payment_method, &"card".into(), card)?;
    js_sys::Reflect::set(&payment_method, &"billing_details".into(), &billing)?;

    let data = js_sys::Object::new();
    js_sys::Reflect::set(&data, &"payment_method".into(), &payment_method)?;
    Ok(data.into())
}

fn card_change_from_js(event: &JsValue) -> CardChange {
    js_sys::JSON::stringify(event)
        .ok()
        .map(String::from)
        .and_then(|json| parse_card_change(&json).ok())
        .unwrap_or_default()
}

fn describe_js_error(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(value, &"message".into())
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{value:?}"))
}

// ============================================================================
// Response decoding
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmResponse {
    #[serde(default)]
    error: Option<StripeErrorBody>,
    #[serde(default)]
    payment_intent: Option<IntentSummary>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Deserialize)]
struct IntentSummary {
    #[serde(default)]
    id: Option<String>,
    status: String,
}

#[derive(Deserialize)]
struct ChangeEvent {
    #[serde(default)]
    error: Option<StripeErrorBody>,
    #[serde(default)]
    complete: bool,
}

/// Decode the resolved value of `confirmCardPayment`
pub fn parse_confirm_response(json: &str) -> Result<PaymentResult> {
    let response: ConfirmResponse = serde_json::from_str(json)?;

    if let Some(error) = response.error {
        let message = error
            .message
            .or(error.code)
            .unwrap_or_else(|| "Your payment could not be confirmed.".into());
        return Err(DonateError::Provider(message));
    }

    let intent = response.payment_intent.ok_or_else(|| {
        DonateError::MalformedResponse("confirmation returned no payment intent".into())
    })?;

    Ok(PaymentResult {
        status: PaymentStatus::parse(&intent.status),
        payment_id: intent.id,
    })
}

/// Decode a card element `change` event
pub fn parse_card_change(json: &str) -> Result<CardChange> {
    let event: ChangeEvent = serde_json::from_str(json)?;
    Ok(CardChange {
        error: event.error.and_then(|e| e.message),
        complete: event.complete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_succeeded_intent() {
        let result = parse_confirm_response(
            r#"{"paymentIntent":{"id":"pi_123","status":"succeeded","amount":10000}}"#,
        )
        .unwrap();
        assert!(result.status.is_terminal_success());
        assert_eq!(result.payment_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn test_parse_declined() {
        let err = parse_confirm_response(
            r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, DonateError::Provider(ref m) if m == "Your card was declined."));
        assert_eq!(err.user_message(), "Payment failed: Your card was declined.");
    }

    #[test]
    fn test_parse_requires_action() {
        let result =
            parse_confirm_response(r#"{"paymentIntent":{"status":"requires_action"}}"#).unwrap();
        assert_eq!(result.status, PaymentStatus::RequiresAction);
        assert!(result.payment_id.is_none());
    }

    #[test]
    fn test_parse_empty_response() {
        assert!(matches!(
            parse_confirm_response("{}"),
            Err(DonateError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_card_change() {
        let invalid = parse_card_change(
            r#"{"elementType":"card","empty":false,"complete":false,
                "error":{"type":"validation_error","code":"invalid_number","message":"Your card number is invalid."}}"#,
        )
        .unwrap();
        assert_eq!(invalid.error.as_deref(), Some("Your card number is invalid."));
        assert!(!invalid.complete);

        let complete = parse_card_change(r#"{"elementType":"card","complete":true}"#).unwrap();
        assert_eq!(complete, CardChange { error: None, complete: true });
    }
}
