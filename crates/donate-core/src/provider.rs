//! Payment Provider Strategy Pattern
//!
//! The hosted payment widget (Stripe.js in the browser, a mock in tests) is
//! an opaque capability: it owns the card input and confirms payments.
//! Card data never passes through this crate.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let provider = loader.load().await?;
//! let card = provider.create_card_input()?;
//! provider.mount_card_input(&card, "#mbx-card-element", listener)?;
//! let result = provider.confirm_payment(&secret, &details).await?;
//! ```

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::wire::ClientSecret;

/// Opaque reference to the provider-managed card input element
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CardInputHandle(u64);

impl CardInputHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

/// Live validation event from the card input
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardChange {
    /// Provider's human-readable message for an invalid or incomplete card
    pub error: Option<String>,

    /// All card fields are filled in
    pub complete: bool,
}

/// Callback the provider invokes on every card input change
pub type CardChangeListener = Box<dyn Fn(CardChange)>;

/// Billing details sent with the confirmation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmDetails {
    pub card: CardInputHandle,
    pub billing_name: String,
    pub billing_email: String,
}

/// Provider-reported payment status
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Processing,
    RequiresAction,
    RequiresPaymentMethod,
    Canceled,
    Other(String),
}

impl PaymentStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "succeeded" => Self::Succeeded,
            "processing" => Self::Processing,
            "requires_action" => Self::RequiresAction,
            "requires_payment_method" => Self::RequiresPaymentMethod,
            "canceled" => Self::Canceled,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Processing => "processing",
            Self::RequiresAction => "requires_action",
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::Canceled => "canceled",
            Self::Other(s) => s,
        }
    }

    /// Only `succeeded` settles a donation
    pub const fn is_terminal_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Outcome of a confirmation the provider did not reject
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentResult {
    pub status: PaymentStatus,

    /// Provider's payment identifier, when reported
    pub payment_id: Option<String>,
}

/// Strategy trait for hosted payment widgets.
///
/// Rejections (declined card, provider-side errors) come back as
/// `DonateError::Provider` carrying the provider's message.
#[async_trait(?Send)]
pub trait PaymentProvider {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Create the card input element. Called once per page lifetime.
    fn create_card_input(&self) -> Result<CardInputHandle>;

    /// Mount the card input into a DOM slot and register the change listener
    fn mount_card_input(
        &self,
        card: &CardInputHandle,
        slot: &str,
        listener: CardChangeListener,
    ) -> Result<()>;

    /// Clear any entered card data without unmounting
    fn clear_card_input(&self, card: &CardInputHandle);

    /// Confirm the payment identified by `secret` with the mounted card
    async fn confirm_payment(
        &self,
        secret: &ClientSecret,
        details: &ConfirmDetails,
    ) -> Result<PaymentResult>;
}

/// Lazily acquires the provider capability (e.g. loads Stripe.js)
#[async_trait(?Send)]
pub trait ProviderLoader {
    async fn load(&self) -> Result<Rc<dyn PaymentProvider>>;
}
