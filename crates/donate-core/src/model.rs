//! Domain Models
//!
//! Data carried by a donation session. Amounts use `rust_decimal`;
//! never f64 for money.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DonateError, Result};

/// Fund tag used when the donor leaves the designation blank
pub const DEFAULT_DESIGNATION: &str = "general";

/// Billing frequency
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    OneTime,
    Monthly,
}

impl Frequency {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneTime => "one_time",
            Self::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = DonateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "one_time" | "one-time" | "once" => Ok(Self::OneTime),
            "monthly" => Ok(Self::Monthly),
            other => Err(DonateError::Config(format!("unknown frequency: {other}"))),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single active amount selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AmountChoice {
    /// One of the preset buttons
    Preset(Decimal),

    /// Typed into the custom amount field
    Custom(Decimal),
}

impl AmountChoice {
    pub const fn amount(&self) -> Decimal {
        match self {
            Self::Preset(v) | Self::Custom(v) => *v,
        }
    }

    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Whether the given preset button should render as selected
    pub fn is_preset(&self, value: Decimal) -> bool {
        matches!(self, Self::Preset(v) if *v == value)
    }
}

/// Parse the custom amount field. Only strictly positive values count;
/// anything else leaves the current selection alone.
pub fn parse_custom_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    let value: Decimal = cleaned.parse().ok()?;
    let value = value.round_dp(2);
    (value > Decimal::ZERO).then_some(value)
}

/// Donor-entered form fields
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,

    /// Fund designation; blank means [`DEFAULT_DESIGNATION`]
    #[serde(default)]
    pub designation: String,
}

impl DonorForm {
    /// Billing name handed to the payment provider
    pub fn billing_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Designation with the default applied
    pub fn fund(&self) -> &str {
        match self.designation.trim() {
            "" => DEFAULT_DESIGNATION,
            fund => fund,
        }
    }

    pub fn set(&mut self, field: DonorField, value: impl Into<String>) {
        let value = value.into();
        match field {
            DonorField::FirstName => self.first_name = value,
            DonorField::LastName => self.last_name = value,
            DonorField::Email => self.email = value,
            DonorField::Designation => self.designation = value,
        }
    }
}

/// Addressable form inputs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DonorField {
    FirstName,
    LastName,
    Email,
    Designation,
}

/// Session lifecycle states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Idle,
    Initializing,
    Open,
    Validating,
    Submitting,
    AwaitingConfirmation,
    Succeeded,
    Failed,
}

impl SessionStatus {
    /// A submission is between validation and settlement
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::Validating | Self::Submitting | Self::AwaitingConfirmation)
    }

    /// The donor may press submit again
    pub const fn is_resubmittable(&self) -> bool {
        matches!(self, Self::Open | Self::Failed)
    }
}

/// How the `amount` field is expressed on the wire
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountUnits {
    /// Currency units, e.g. `250` or `12.5` dollars
    #[default]
    Major,

    /// Smallest currency unit, e.g. `25000` cents
    Minor,
}

impl std::str::FromStr for AmountUnits {
    type Err = DonateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "major" | "decimal" | "dollars" => Ok(Self::Major),
            "minor" | "cents" => Ok(Self::Minor),
            other => Err(DonateError::Config(format!("unknown amount units: {other}"))),
        }
    }
}
