//! Session Configuration

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{DonateError, Result};
use crate::model::{AmountUnits, Frequency};

/// Deploy-time settings for the donation modal
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DonateConfig {
    /// Create-payment-intent endpoint
    pub backend_url: String,

    /// Provider publishable key. Publishable keys are not secret.
    #[serde(default)]
    pub publishable_key: String,

    /// ISO currency code sent to the backend
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Units of the `amount` field on the wire
    #[serde(default)]
    pub amount_units: AmountUnits,

    /// Preset buttons, in display order
    #[serde(default = "default_presets")]
    pub presets: Vec<Decimal>,

    /// Amount selected after every reset
    #[serde(default = "default_amount")]
    pub default_amount: Decimal,

    /// Frequency selected after every reset
    #[serde(default)]
    pub default_frequency: Frequency,

    /// DOM slot the card input mounts into
    #[serde(default = "default_card_slot")]
    pub card_slot: String,

    /// Delay between success and the automatic close
    #[serde(default = "default_auto_close_delay")]
    pub auto_close_delay: Duration,

    /// Upper bound on the create-payment-intent call
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,
}

fn default_currency() -> String { "usd".into() }
fn default_presets() -> Vec<Decimal> { vec![dec!(50), dec!(100), dec!(250), dec!(500), dec!(1000)] }
fn default_amount() -> Decimal { dec!(250) }
fn default_card_slot() -> String { "#mbx-card-element".into() }
fn default_auto_close_delay() -> Duration { Duration::from_secs(3) }
fn default_request_timeout() -> Duration { Duration::from_secs(30) }

impl Default for DonateConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000/donations".into(),
            publishable_key: String::new(),
            currency: default_currency(),
            amount_units: AmountUnits::default(),
            presets: default_presets(),
            default_amount: default_amount(),
            default_frequency: Frequency::default(),
            card_slot: default_card_slot(),
            auto_close_delay: default_auto_close_delay(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl DonateConfig {
    /// Build from a key lookup (environment, `option_env!` table, ...).
    /// Missing keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("DONATE_BACKEND_URL") {
            config.backend_url = url;
        }
        if let Some(key) = lookup("DONATE_PUBLISHABLE_KEY") {
            config.publishable_key = key;
        }
        if let Some(currency) = lookup("DONATE_CURRENCY") {
            config.currency = currency.to_lowercase();
        }
        if let Some(units) = lookup("DONATE_AMOUNT_UNITS") {
            config.amount_units = units.parse()?;
        }
        if let Some(secs) = lookup("DONATE_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| DonateError::Config(format!("invalid timeout: {secs}")))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the controller cannot honor
    pub fn validate(&self) -> Result<()> {
        if self.backend_url.trim().is_empty() {
            return Err(DonateError::Config("backend URL is empty".into()));
        }
        if self.default_amount <= Decimal::ZERO {
            return Err(DonateError::Config("default amount must be positive".into()));
        }
        if self.presets.iter().any(|p| *p <= Decimal::ZERO) {
            return Err(DonateError::Config("preset amounts must be positive".into()));
        }
        Ok(())
    }
}
