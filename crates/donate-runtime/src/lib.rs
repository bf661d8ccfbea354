//! # donate-runtime
//!
//! Runtime collaborators for the donation session.
//!
//! ## Backends
//!
//! - **HTTP** (default): `POST` to the create-payment-intent endpoint via
//!   reqwest; works natively and in the browser (wasm32)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use donate_runtime::{config_from_env, HttpDonationBackend};
//!
//! let config = config_from_env()?;
//! let backend = HttpDonationBackend::from_config(&config)?;
//! let session = DonationSession::new(config, loader, Rc::new(backend), clock)?;
//! ```

pub mod http;

pub use http::{HttpBackendConfig, HttpDonationBackend};

// Re-export core types for convenience
pub use donate_core::{
    DonateConfig, DonateError, DonationBackend, DonationRequest, DonationSession, Result,
};

/// Load [`DonateConfig`] from `DONATE_*` environment variables
pub fn config_from_env() -> Result<DonateConfig> {
    DonateConfig::from_lookup(|key| std::env::var(key).ok())
}
