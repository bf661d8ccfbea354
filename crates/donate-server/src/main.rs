//! donate-server
//!
//! Reference donation backend. Creates Stripe PaymentIntents for the donate
//! modal and hands back their client secrets.

mod handlers;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use donate_payments::{IdempotencyStore, IntentCreator, MemoryIdempotencyStore, StripeClient};

use crate::state::{AppState, ServerConfig};

/// How often expired idempotency records are dropped
const PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Initialize payments
    let intents: Option<Arc<dyn IntentCreator>> = match StripeClient::from_env() {
        Ok(stripe) => {
            tracing::info!("✓ Stripe configured");
            Some(Arc::new(stripe))
        }
        Err(e) => {
            tracing::warn!("⚠ Stripe not configured - donations disabled ({e})");
            tracing::warn!("  Set STRIPE_SECRET_KEY in .env");
            None
        }
    };

    let idempotency = Arc::new(MemoryIdempotencyStore::new(config.dedup_window));
    spawn_purge(idempotency.clone());

    let state = AppState {
        intents,
        idempotency,
        amount_units: config.amount_units,
    };

    // CORS configuration (the modal is embedded on other origins)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = handlers::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("donate-server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!(
        amount_units = ?config.amount_units,
        dedup_window_secs = config.dedup_window.num_seconds(),
        "Endpoints: GET /health, POST /donations"
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically drop idempotency records that left the window
fn spawn_purge(store: Arc<MemoryIdempotencyStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired() {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "Purged idempotency records"),
                Err(e) => tracing::warn!("Idempotency purge failed: {e}"),
            }
        }
    });
}
