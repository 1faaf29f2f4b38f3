//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use synapse_payments::{CheckoutRequest as PlanCheckout, Plan, SIGNATURE_HEADER};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub plan: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        store: state.store_backend,
    })
}

/// Create a Square payment link for the caller's chosen plan
///
/// `AuthUser` is extracted before the body, so an unauthenticated call is
/// rejected whatever it sent.
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        tracing::debug!(user_id = %user.user_id, error = %e, "Unreadable checkout body");
        ApiError::invalid_plan()
    })?;

    let plan: Plan = payload
        .plan
        .as_deref()
        .ok_or_else(ApiError::invalid_plan)?
        .parse()
        .map_err(|_| ApiError::invalid_plan())?;

    tracing::debug!(user_id = %user.user_id, email = ?user.email, plan = %plan, "Checkout requested");

    let request = PlanCheckout {
        user_id: user.user_id.clone(),
        plan,
    };

    let session = state.checkout.create_checkout_session(request).await.map_err(|e| {
        tracing::error!(user_id = %user.user_id, plan = %plan, error = %e, "Square API error");
        ApiError::internal(e)
    })?;

    Ok(Json(CheckoutResponse { url: session.url }))
}

/// Square webhook handler
///
/// Acknowledges every POST that passes signature checks; processing failures
/// are logged, not reported, so Square does not redeliver.
pub async fn square_webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    }

    if let Some(verifier) = &state.verifier {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();

        if let Err(e) = verifier.verify(&body, signature) {
            tracing::warn!(error = %e, "Webhook signature failed");
            return (StatusCode::UNAUTHORIZED, "Invalid signature");
        }
    }

    // failures were already logged with their order/user context
    let outcome = state.webhooks.process(&body).await;
    tracing::debug!(?outcome, "Webhook processed");

    (StatusCode::OK, "Received")
}
