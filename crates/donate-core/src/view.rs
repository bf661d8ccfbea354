//! Render State
//!
//! Snapshot of everything the modal shows. Only the session writes it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::DonateConfig;
use crate::model::{AmountChoice, DonorForm, Frequency, SessionStatus};
use crate::validate::ValidationReport;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalView {
    /// Backdrop shown
    pub visible: bool,

    pub status: SessionStatus,

    /// Active amount selection
    pub amount: AmountChoice,

    /// Raw text of the custom amount field
    pub custom_input: String,

    pub frequency: Frequency,
    pub form: DonorForm,

    /// Per-field error indicators
    pub field_errors: ValidationReport,

    /// Live message from the card input
    pub card_error: Option<String>,

    pub submit_enabled: bool,

    /// Spinner on the submit button
    pub loading: bool,

    pub success_visible: bool,

    /// User-facing failure message, shown until dismissed
    pub failure: Option<String>,

    /// Initialization warning (provider could not be loaded)
    pub warning: Option<String>,

    /// Underlying page scrolling disabled
    pub scroll_locked: bool,
}

impl ModalView {
    /// Closed modal with default selections
    pub fn closed(config: &DonateConfig) -> Self {
        Self {
            visible: false,
            status: SessionStatus::Idle,
            amount: AmountChoice::Preset(config.default_amount),
            custom_input: String::new(),
            frequency: config.default_frequency,
            form: DonorForm::default(),
            field_errors: ValidationReport::default(),
            card_error: None,
            submit_enabled: false,
            loading: false,
            success_visible: false,
            failure: None,
            warning: None,
            scroll_locked: false,
        }
    }

    pub const fn amount_value(&self) -> Decimal {
        self.amount.amount()
    }
}
