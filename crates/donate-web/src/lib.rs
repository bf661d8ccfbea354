//! donate-modal Web Frontend
//!
//! Leptos-based WASM front end for the donate modal. The session controller
//! lives in `donate-core`; this crate supplies the browser collaborators
//! (Stripe.js, gloo timers, the HTTP backend) and renders the `ModalView`.

mod app;
mod bindings;
mod clock;
mod components;
mod config;
mod logging;
mod pages;
mod stripe;

pub use app::{App, ModalContext};
pub use clock::BrowserClock;
pub use stripe::{parse_card_change, parse_confirm_response, StripeJsLoader, StripeJsProvider};

use wasm_bindgen::prelude::*;

/// WASM entry point
#[allow(unsafe_code)]
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    logging::init(tracing::Level::INFO);
    leptos::mount::mount_to_body(App);
}
