//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Donation request failed validation
    #[error("Invalid donation: {0}")]
    InvalidRequest(String),

    /// Idempotency key missing or malformed
    #[error("Idempotency key invalid: {0}")]
    IdempotencyKey(String),

    /// Idempotency key reused with a different request body
    #[error("Idempotency key reused with different parameters: {0}")]
    IdempotencyConflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Stripe(_) | Self::Storage(_))
    }

    /// Machine-readable code for API responses
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Stripe(_) => "STRIPE_ERROR",
            Self::InvalidRequest(_) => "INVALID_DONATION",
            Self::IdempotencyKey(_) => "INVALID_IDEMPOTENCY_KEY",
            Self::IdempotencyConflict(_) => "IDEMPOTENCY_CONFLICT",
            Self::Config(_) => "PAYMENTS_DISABLED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Stripe(_) => "Payment processing failed. Please try again.".into(),
            Self::InvalidRequest(reason) => format!("Invalid donation: {reason}"),
            Self::IdempotencyKey(_) => "Missing or invalid Idempotency-Key header.".into(),
            Self::IdempotencyConflict(_) => {
                "This donation was already submitted with different details.".into()
            }
            Self::Config(_) => "Donations are temporarily unavailable.".into(),
            Self::Storage(_) => "An error occurred processing your request.".into(),
        }
    }
}
