//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use donate_core::{
    wire::{ErrorBody, IntentResponse, IDEMPOTENCY_HEADER},
    ClientSecret, DonationRequest, IdempotencyKey,
};
use donate_payments::{fingerprint, Donation, IdempotencyRecord, PaymentError};

use crate::state::AppState;

/// Longest key Stripe accepts
const MAX_KEY_LEN: usize = 255;

type ApiError = (StatusCode, Json<ErrorBody>);

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_configured: bool,
}

// ============================================================================
// Router
// ============================================================================

/// Build the API routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/donations", post(create_donation))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_configured: state.intents.is_some(),
    })
}

/// Create a payment intent for a donation and return its client secret
pub async fn create_donation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IntentResponse>, ApiError> {
    let intents = state
        .intents
        .as_ref()
        .ok_or_else(|| api_error(&PaymentError::Config("Stripe not configured".into())))?;

    let key = idempotency_key(&headers).map_err(|e| api_error(&e))?;

    let request: DonationRequest = serde_json::from_slice(&body).map_err(|e| {
        api_error(&PaymentError::InvalidRequest(format!("malformed body: {e}")))
    })?;
    let donation = Donation::from_request(&request, state.amount_units).map_err(|e| {
        tracing::info!(idempotency_key = %key, error = %e, "Rejected donation");
        api_error(&e)
    })?;
    let digest = fingerprint(&request).map_err(|e| api_error(&e))?;

    if let Some(record) = state.idempotency.get(key.as_str()).map_err(|e| api_error(&e))? {
        if record.fingerprint != digest {
            tracing::warn!(idempotency_key = %key, "Idempotency key reused with different body");
            return Err(api_error(&PaymentError::IdempotencyConflict(key.to_string())));
        }
        tracing::info!(idempotency_key = %key, intent_id = %record.intent_id, "Replaying payment intent");
        return Ok(Json(IntentResponse {
            client_secret: ClientSecret::new(record.client_secret),
        }));
    }

    let intent = intents.create_intent(&donation, &key).await.map_err(|e| {
        tracing::error!(idempotency_key = %key, error = %e, "Payment intent creation failed");
        api_error(&e)
    })?;

    state
        .idempotency
        .save(IdempotencyRecord::new(
            key.as_str(),
            digest,
            intent.id.as_str(),
            intent.client_secret.as_str(),
        ))
        .map_err(|e| api_error(&e))?;

    Ok(Json(IntentResponse {
        client_secret: ClientSecret::new(intent.client_secret),
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn idempotency_key(headers: &HeaderMap) -> Result<IdempotencyKey, PaymentError> {
    let raw = headers
        .get(IDEMPOTENCY_HEADER)
        .ok_or_else(|| PaymentError::IdempotencyKey("header missing".into()))?
        .to_str()
        .map_err(|_| PaymentError::IdempotencyKey("not visible ASCII".into()))?
        .trim();

    if raw.is_empty() {
        return Err(PaymentError::IdempotencyKey("empty".into()));
    }
    if raw.len() > MAX_KEY_LEN {
        return Err(PaymentError::IdempotencyKey(format!(
            "longer than {MAX_KEY_LEN} characters"
        )));
    }
    Ok(IdempotencyKey::from_string(raw))
}

const fn status_for(error: &PaymentError) -> StatusCode {
    match error {
        PaymentError::InvalidRequest(_) | PaymentError::IdempotencyKey(_) => {
            StatusCode::BAD_REQUEST
        }
        PaymentError::IdempotencyConflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PaymentError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::Stripe(_) => StatusCode::BAD_GATEWAY,
        PaymentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(error: &PaymentError) -> ApiError {
    (
        status_for(error),
        Json(ErrorBody {
            error: error.user_message(),
            code: error.code().into(),
        }),
    )
}
