//! Stripe PaymentIntent Integration
//!
//! Implements the "Stripe Elements (Embedded)" approach: the server creates a
//! PaymentIntent and hands its client secret to the browser, which confirms
//! the card with Stripe.js.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stripe::{Client, CreatePaymentIntent, Currency, PaymentIntent, RequestStrategy};

use donate_core::IdempotencyKey;

use crate::donation::Donation;
use crate::error::{PaymentError, Result};

/// A created payment intent
#[derive(Clone, Serialize, Deserialize)]
pub struct CreatedIntent {
    /// Stripe PaymentIntent ID
    pub id: String,

    /// Secret the browser confirms with
    pub client_secret: String,
}

impl std::fmt::Debug for CreatedIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedIntent")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Creates payment intents for validated donations
#[async_trait]
pub trait IntentCreator: Send + Sync {
    /// Create an intent, deduplicated by `key` on the processor side
    async fn create_intent(&self, donation: &Donation, key: &IdempotencyKey)
        -> Result<CreatedIntent>;
}

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;
        if secret_key.trim().is_empty() {
            return Err(PaymentError::Config("STRIPE_SECRET_KEY is empty".into()));
        }

        Ok(Self::new(&secret_key))
    }

    /// Get the underlying Stripe client
    pub const fn inner(&self) -> &Client {
        &self.client
    }
}

/// Map a lowercase ISO code to Stripe's currency enum
pub fn stripe_currency(code: &str) -> Result<Currency> {
    match code {
        "usd" => Ok(Currency::USD),
        "eur" => Ok(Currency::EUR),
        "gbp" => Ok(Currency::GBP),
        "cad" => Ok(Currency::CAD),
        "aud" => Ok(Currency::AUD),
        other => Err(PaymentError::InvalidRequest(format!(
            "unsupported currency: {other}"
        ))),
    }
}

#[async_trait]
impl IntentCreator for StripeClient {
    async fn create_intent(
        &self,
        donation: &Donation,
        key: &IdempotencyKey,
    ) -> Result<CreatedIntent> {
        let client = self
            .client
            .clone()
            .with_strategy(RequestStrategy::Idempotent(key.as_str().to_string()));

        let description = donation.description();
        let mut params =
            CreatePaymentIntent::new(donation.amount_minor, stripe_currency(&donation.currency)?);
        params.description = Some(&description);
        params.receipt_email = Some(&donation.donor.email);
        params.metadata = Some(donation.metadata());

        let intent = PaymentIntent::create(&client, params)
            .await
            .map_err(|e| PaymentError::Stripe(e.to_string()))?;

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::Stripe("No client secret returned".into()))?;

        tracing::info!(
            intent_id = %intent.id,
            amount_minor = donation.amount_minor,
            currency = %donation.currency,
            frequency = donation.frequency.as_str(),
            "Created payment intent"
        );

        Ok(CreatedIntent {
            id: intent.id.to_string(),
            client_secret,
        })
    }
}
