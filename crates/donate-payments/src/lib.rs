//! # donate-payments
//!
//! Server half of the donation backend contract.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  POST /donations   ┌──────────────┐  PaymentIntent  ┌────────┐
//! │ Donate      │───────────────────▶│ donate-server│────────────────▶│ Stripe │
//! │ Modal       │◀───────────────────│              │◀────────────────│        │
//! └─────────────┘   {clientSecret}   └──────────────┘   client_secret └────────┘
//!        │                                                                 ▲
//!        └──────────────── confirmCardPayment (Stripe.js) ─────────────────┘
//! ```
//!
//! The card never touches this server. Each request carries an
//! `Idempotency-Key`; the key is remembered for a window
//! ([`MemoryIdempotencyStore`]) and forwarded to Stripe, so a retried
//! submission gets the same intent back.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use donate_payments::{Donation, IntentCreator, StripeClient};
//!
//! let stripe = StripeClient::new("sk_test_xxx");
//! let donation = Donation::from_request(&request, AmountUnits::Major)?;
//! let intent = stripe.create_intent(&donation, &key).await?;
//!
//! // Respond with: {"clientSecret": intent.client_secret}
//! ```

mod donation;
mod error;
mod idempotency;
mod intent;

pub use donation::{fingerprint, Donation, SUPPORTED_CURRENCIES};
pub use error::{PaymentError, Result};
pub use idempotency::{
    IdempotencyRecord, IdempotencyStore, MemoryIdempotencyStore, DEFAULT_WINDOW_SECS,
};
pub use intent::{stripe_currency, CreatedIntent, IntentCreator, StripeClient};
