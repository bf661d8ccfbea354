//! Stripe.js Bindings
//!
//! Minimal surface of the global `Stripe` constructor, Elements and the card
//! element. Only what the donate modal calls is declared.

#![allow(unsafe_code)]

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// Stripe.js client
    #[derive(Clone, Debug)]
    pub type Stripe;

    /// `Stripe(publishableKey)`
    #[wasm_bindgen(catch, js_name = Stripe)]
    pub fn create_stripe(publishable_key: &str) -> Result<Stripe, JsValue>;

    #[wasm_bindgen(method, catch)]
    pub fn elements(this: &Stripe) -> Result<Elements, JsValue>;

    /// Resolves to `{error}` or `{paymentIntent}`; never rejects for declines
    #[wasm_bindgen(method, js_name = confirmCardPayment)]
    pub fn confirm_card_payment(
        this: &Stripe,
        client_secret: &str,
        data: &JsValue,
    ) -> js_sys::Promise;

    /// Elements group
    #[derive(Clone, Debug)]
    pub type Elements;

    #[wasm_bindgen(method, catch)]
    pub fn create(this: &Elements, kind: &str, options: &JsValue) -> Result<CardElement, JsValue>;

    /// Hosted card input
    #[derive(Clone, Debug)]
    pub type CardElement;

    #[wasm_bindgen(method, catch)]
    pub fn mount(this: &CardElement, selector: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method)]
    pub fn clear(this: &CardElement);

    #[wasm_bindgen(method)]
    pub fn on(this: &CardElement, event: &str, handler: &js_sys::Function);
}

/// Whether `window.Stripe` is already defined
pub fn stripe_loaded() -> bool {
    js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str("Stripe")).unwrap_or(false)
}
