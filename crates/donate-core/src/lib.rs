//! # donate-core
//!
//! Session lifecycle for an embedded donation modal: open, configure,
//! validate, submit, settle, reset.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     DonationSession                          │
//! │  ┌─────────────┐  ┌──────────────┐  ┌──────────────────────┐ │
//! │  │   State     │  │  Validator   │  │  PaymentProvider     │ │
//! │  │  Machine    │──│  (stateless) │  │  (Strategy)          │ │
//! │  └─────────────┘  └──────────────┘  └──────────────────────┘ │
//! │         │                            ┌──────────────────────┐ │
//! │         └────────────────────────────│  DonationBackend     │ │
//! │                                      └──────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Card tokenization and payment authorization stay with the hosted
//! provider. This crate only sequences the calls: a client secret from the
//! backend, then confirmation with the provider, never the other way round
//! and never with a secret from an earlier submission.
//!
//! The collaborators are traits so the same controller runs against Stripe.js
//! in the browser and against the mocks in [`mock`] under test.

pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod mock;
pub mod model;
pub mod provider;
pub mod session;
pub mod validate;
pub mod view;
pub mod wire;

pub use backend::DonationBackend;
pub use clock::Clock;
pub use config::DonateConfig;
pub use error::{DonateError, Result};
pub use model::{AmountChoice, AmountUnits, DonorField, DonorForm, Frequency, SessionStatus};
pub use provider::{CardChange, CardInputHandle, PaymentProvider, PaymentResult, ProviderLoader};
pub use session::{DonationSession, IgnoreReason, SessionSlot, SubmitOutcome};
pub use validate::{validate_donor, ValidationReport};
pub use view::ModalView;
pub use wire::{ClientSecret, DonationRequest, IdempotencyKey};

pub use rust_decimal::Decimal;
