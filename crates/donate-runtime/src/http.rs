//! HTTP Donation Backend
//!
//! Implementation of `DonationBackend` over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use donate_core::{
    error::{DonateError, Result},
    wire::{ClientSecret, DonationRequest, IdempotencyKey, IntentResponse, IDEMPOTENCY_HEADER},
    DonateConfig, DonationBackend,
};

/// Backend endpoint configuration
#[derive(Clone, Debug)]
pub struct HttpBackendConfig {
    /// Create-payment-intent URL
    pub url: String,

    /// Transport timeout (native only; the session enforces its own)
    pub timeout: Duration,
}

impl HttpBackendConfig {
    pub fn from_donate_config(config: &DonateConfig) -> Self {
        Self {
            url: config.backend_url.clone(),
            timeout: config.request_timeout,
        }
    }
}

/// reqwest-backed donation backend
pub struct HttpDonationBackend {
    client: reqwest::Client,
    config: HttpBackendConfig,
}

impl HttpDonationBackend {
    /// Create a backend for the given endpoint
    pub fn new(config: HttpBackendConfig) -> Result<Self> {
        let builder = reqwest::Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(config.timeout);

        let client = builder
            .build()
            .map_err(|e| DonateError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from the session configuration
    pub fn from_config(config: &DonateConfig) -> Result<Self> {
        Self::new(HttpBackendConfig::from_donate_config(config))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Pull the `error` field out of a failure body for the logs
    fn describe_failure(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_else(|| body.chars().take(200).collect())
    }
}

#[async_trait(?Send)]
impl DonationBackend for HttpDonationBackend {
    async fn create_intent(
        &self,
        request: &DonationRequest,
        key: &IdempotencyKey,
    ) -> Result<ClientSecret> {
        let response = self
            .client
            .post(&self.config.url)
            .header(IDEMPOTENCY_HEADER, key.as_str())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DonateError::Timeout(self.config.timeout)
                } else {
                    DonateError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                idempotency_key = %key,
                reason = %Self::describe_failure(&body),
                "Donation backend rejected request"
            );
            return Err(DonateError::Backend {
                status: status.as_u16(),
            });
        }

        let body: IntentResponse = response
            .json()
            .await
            .map_err(|e| DonateError::MalformedResponse(e.to_string()))?;

        if body.client_secret.expose().trim().is_empty() {
            return Err(DonateError::MalformedResponse("empty clientSecret".into()));
        }

        tracing::debug!(idempotency_key = %key, "Received client secret");
        Ok(body.client_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use donate_core::{AmountUnits, Decimal, DonorForm, Frequency};
    use mockito::Matcher;

    fn request() -> DonationRequest {
        let form = DonorForm {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: "jane@x.com".into(),
            designation: String::new(),
        };
        DonationRequest::new(&form, Frequency::Monthly, Decimal::from(100), "usd", AmountUnits::Major)
            .unwrap()
    }

    fn backend(url: String) -> HttpDonationBackend {
        HttpDonationBackend::new(HttpBackendConfig {
            url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_posts_request_with_idempotency_key() {
        let mut server = mockito::Server::new_async().await;
        let key = IdempotencyKey::generate();
        let mock = server
            .mock("POST", "/donations")
            .match_header("idempotency-key", key.as_str())
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "fund": "general",
                "frequency": "monthly",
                "amount": 100,
                "currency": "usd",
                "metadata": {"firstName": "Jane", "lastName": "Doe", "email": "jane@x.com"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"clientSecret":"cs_test_1"}"#)
            .create_async()
            .await;

        let backend = backend(format!("{}/donations", server.url()));
        let secret = backend.create_intent(&request(), &key).await.unwrap();

        assert_eq!(secret.expose(), "cs_test_1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_2xx_is_backend_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/donations")
            .with_status(502)
            .with_body(r#"{"error":"upstream down","code":"STRIPE_ERROR"}"#)
            .create_async()
            .await;

        let backend = backend(format!("{}/donations", server.url()));
        let err = backend
            .create_intent(&request(), &IdempotencyKey::generate())
            .await
            .unwrap_err();

        assert!(matches!(err, DonateError::Backend { status: 502 }));
    }

    #[tokio::test]
    async fn test_missing_secret_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/donations")
            .with_status(200)
            .with_body(r#"{"id":"pi_123"}"#)
            .create_async()
            .await;

        let backend = backend(format!("{}/donations", server.url()));
        let err = backend
            .create_intent(&request(), &IdempotencyKey::generate())
            .await
            .unwrap_err();

        assert!(matches!(err, DonateError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_is_network_error() {
        // Nothing listens on port 9 (discard) in the test environment
        let backend = backend("http://127.0.0.1:9/donations".into());
        let err = backend
            .create_intent(&request(), &IdempotencyKey::generate())
            .await
            .unwrap_err();

        assert!(matches!(err, DonateError::Network(_) | DonateError::Timeout(_)));
    }

    #[test]
    fn test_describe_failure() {
        assert_eq!(
            HttpDonationBackend::describe_failure(r#"{"error":"bad amount","code":"INVALID"}"#),
            "bad amount"
        );
        assert_eq!(HttpDonationBackend::describe_failure("oops"), "oops");
    }
}
