//! synapse HTTP Server
//!
//! Axum server exposing plan checkout and the Square webhook endpoint.

mod auth;
mod config;
mod error;
mod handlers;
mod state;


use std::sync::Arc;

use axum::{
    routing::{any, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use synapse_payments::{FirestoreUserStore, GcpTokenSource, MemoryUserStore, SquareClient, UserStore};

use crate::auth::JwtAuthenticator;
use crate::config::{ServerConfig, StoreConfig};
use crate::handlers::{create_checkout, health_check, square_webhook};
use crate::state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/checkout", post(create_checkout))
        // Method filtering happens in the handler so non-POST gets a plain 405 body
        .route("/webhooks/square", any(square_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

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

    let provider = Arc::new(SquareClient::new(&config.square)?);
    tracing::info!(environment = ?config.square.environment, "✓ Square configured");

    let store: Arc<dyn UserStore> = match config.store.clone() {
        StoreConfig::Firestore(firestore) => {
            let tokens = Arc::new(GcpTokenSource::new().await?);
            tracing::info!(project = %firestore.project_id, "✓ Firestore user store");
            Arc::new(FirestoreUserStore::new(firestore, tokens)?)
        }
        StoreConfig::Memory => {
            tracing::warn!(
                "⚠ USER_STORE=memory - the store starts empty, so plan upgrades for paying users are dropped"
            );
            Arc::new(MemoryUserStore::new())
        }
    };

    if config.webhook_verifier.is_none() {
        tracing::warn!("⚠ SQUARE_WEBHOOK_SIGNATURE_KEY not set - webhook payloads are trusted unverified");
    }

    let auth = JwtAuthenticator::new(&config.auth.jwt_secret, config.auth.audience.as_deref());

    // Build application state
    let state = AppState::new(
        provider,
        store,
        config.checkout.clone(),
        auth,
        config.webhook_verifier.clone(),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("synapse server running on http://{}", config.bind_addr);
    tracing::info!("  GET  /health           - Health check");
    tracing::info!("  POST /api/checkout     - Create Square payment link");
    tracing::info!("  POST /webhooks/square  - Square notifications");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
