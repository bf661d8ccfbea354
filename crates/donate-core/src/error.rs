//! Error Types

use std::time::Duration;

use thiserror::Error;

use crate::validate::ValidationReport;

/// Result type alias for donation operations
pub type Result<T> = std::result::Result<T, DonateError>;

/// Donation error types
#[derive(Error, Debug)]
pub enum DonateError {
    /// Payment provider capability could not be acquired (script unreachable, bad key)
    #[error("Payment provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Card input could not be created or mounted
    #[error("Card input error: {0}")]
    CardInput(String),

    /// Donor form failed local validation
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    /// Donation backend answered with a non-success status
    #[error("Backend returned HTTP {status}")]
    Backend { status: u16 },

    /// Donation backend could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// Donation backend did not answer in time
    #[error("Backend timed out after {0:?}")]
    Timeout(Duration),

    /// Donation backend answered with a body we cannot use
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    /// Provider rejected the confirmation (declined card, provider-side error)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider finished without a terminal success status
    #[error("Payment not completed (status: {0})")]
    PaymentIncomplete(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DonateError {
    /// Check if the user can reasonably try the same submission again
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Backend { status: 500..=599 }
        )
    }

    /// Convert to a user-facing message
    pub fn user_message(&self) -> String {
        match self {
            Self::ProviderUnavailable(_) => {
                "Card payments are temporarily unavailable. Please try again later.".into()
            }
            Self::CardInput(_) => "The card form could not be loaded. Please reload the page.".into(),
            Self::Validation(_) => "Please fill in the highlighted fields.".into(),
            Self::Backend { status } => format!("Payment failed: HTTP error! status: {status}"),
            Self::Network(_) => "Payment failed: could not reach the donation service.".into(),
            Self::Timeout(_) => "Payment failed: the donation service took too long to respond.".into(),
            Self::MalformedResponse(_) => {
                "Payment failed: unexpected response from the donation service.".into()
            }
            // Provider text is already written for end users
            Self::Provider(message) => format!("Payment failed: {message}"),
            Self::PaymentIncomplete(status) => {
                format!("Payment is not complete yet (status: {status}).")
            }
            Self::Config(_) | Self::Json(_) => "An unexpected error occurred.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_message_passes_through() {
        let err = DonateError::Provider("Your card was declined.".into());
        assert_eq!(err.user_message(), "Payment failed: Your card was declined.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_incomplete_payment_names_status_without_promising_no_charge() {
        let message = DonateError::PaymentIncomplete("processing".into()).user_message();
        assert_eq!(message, "Payment is not complete yet (status: processing).");
        assert!(!message.contains("charged"));
    }

    #[test]
    fn test_retryable_backend_statuses() {
        assert!(DonateError::Backend { status: 502 }.is_retryable());
        assert!(!DonateError::Backend { status: 400 }.is_retryable());
        assert!(DonateError::Timeout(Duration::from_secs(30)).is_retryable());
    }
}
