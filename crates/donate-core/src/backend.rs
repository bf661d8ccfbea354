//! Donation Backend
//!
//! Remote endpoint that turns a donation request into a client secret.

use async_trait::async_trait;

use crate::error::Result;
use crate::wire::{ClientSecret, DonationRequest, IdempotencyKey};

/// Create-payment-intent endpoint.
///
/// Implementations map non-2xx answers to `DonateError::Backend`, transport
/// failures to `DonateError::Network` and unusable bodies (including an
/// empty secret) to `DonateError::MalformedResponse`.
#[async_trait(?Send)]
pub trait DonationBackend {
    async fn create_intent(
        &self,
        request: &DonationRequest,
        key: &IdempotencyKey,
    ) -> Result<ClientSecret>;
}
