//! Application State

use std::sync::Arc;

use donate_core::AmountUnits;
use donate_payments::{IdempotencyStore, IntentCreator, DEFAULT_WINDOW_SECS};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment intent creator (None if Stripe is not configured)
    pub intents: Option<Arc<dyn IntentCreator>>,

    /// Idempotency window for replaying client secrets
    pub idempotency: Arc<dyn IdempotencyStore>,

    /// How `amount` is interpreted on the wire
    pub amount_units: AmountUnits,
}

/// Server settings read from the environment
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub amount_units: AmountUnits,
    pub dedup_window: chrono::Duration,
}

impl ServerConfig {
    /// Load from `BIND_ADDR`, `DONATE_AMOUNT_UNITS`, `DONATE_DEDUP_WINDOW_SECS`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let amount_units = match lookup("DONATE_AMOUNT_UNITS") {
            Some(raw) => raw.parse()?,
            None => AmountUnits::default(),
        };

        let window_secs = match lookup("DONATE_DEDUP_WINDOW_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| anyhow::anyhow!("invalid DONATE_DEDUP_WINDOW_SECS: {raw}"))?,
            None => DEFAULT_WINDOW_SECS,
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            amount_units,
            dedup_window: chrono::Duration::seconds(window_secs),
        })
    }
}
