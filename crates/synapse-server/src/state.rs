//! Application State

use std::sync::Arc;

use synapse_payments::{
    CheckoutConfig, CheckoutService, PaymentProvider, UserStore, WebhookHandler, WebhookVerifier,
};

use crate::auth::JwtAuthenticator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment link creation
    pub checkout: Arc<CheckoutService>,

    /// Notification processing
    pub webhooks: Arc<WebhookHandler>,

    /// Signature checks (optional - None trusts payloads as-is)
    pub verifier: Option<Arc<WebhookVerifier>>,

    /// Bearer token validation for checkout callers
    pub auth: Arc<JwtAuthenticator>,

    /// Name of the user store backend
    pub store_backend: &'static str,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        store: Arc<dyn UserStore>,
        checkout: CheckoutConfig,
        auth: JwtAuthenticator,
        verifier: Option<WebhookVerifier>,
    ) -> Self {
        Self {
            checkout: Arc::new(CheckoutService::new(provider.clone(), checkout)),
            store_backend: store.backend(),
            webhooks: Arc::new(WebhookHandler::new(provider, store)),
            verifier: verifier.map(Arc::new),
            auth: Arc::new(auth),
        }
    }
}
