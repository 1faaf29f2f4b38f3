//! Hosted Checkout
//!
//! Builds payment-link requests for a plan purchase and hands them to the
//! provider. The user never leaves the provider's page with card data; we only
//! ever see the resulting link URL.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{PaymentError, Result};
use crate::plan::Plan;
use crate::provider::{
    CheckoutOptions, Currency, LineItem, METADATA_PLAN, METADATA_USER_ID, Money, OrderDraft,
    PaymentLinkRequest, PaymentProvider,
};

/// Default redirect target after payment; `{CHECKOUT_ID}` is filled in by Square.
pub const DEFAULT_SUCCESS_URL: &str = "https://coaihq.online/success.html?session_id={CHECKOUT_ID}";

/// Checkout configuration
#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    /// Square location the order is booked against
    pub location_id: String,

    /// Static page the buyer is sent to after paying
    pub success_url: String,
}

impl CheckoutConfig {
    pub fn new(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            success_url: DEFAULT_SUCCESS_URL.into(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let location_id = std::env::var("SQUARE_LOCATION_ID")
            .map_err(|_| PaymentError::Config("SQUARE_LOCATION_ID not set".into()))?;
        let success_url =
            std::env::var("CHECKOUT_SUCCESS_URL").unwrap_or_else(|_| DEFAULT_SUCCESS_URL.into());

        Ok(Self {
            location_id,
            success_url,
        })
    }
}

/// Request to create a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Authenticated purchaser
    pub user_id: String,

    /// Plan to purchase
    pub plan: Plan,
}

impl CheckoutRequest {
    /// Idempotency key: caller id followed by the request timestamp
    pub fn idempotency_key(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}{}",
            self.user_id,
            now.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }

    /// Build the provider request for this purchase
    pub fn to_payment_link_request(
        &self,
        config: &CheckoutConfig,
        now: DateTime<Utc>,
    ) -> PaymentLinkRequest {
        let pricing = self.plan.pricing();

        let mut metadata = BTreeMap::new();
        metadata.insert(METADATA_USER_ID.to_string(), self.user_id.clone());
        metadata.insert(METADATA_PLAN.to_string(), self.plan.as_str().to_string());

        PaymentLinkRequest {
            idempotency_key: self.idempotency_key(now),
            description: pricing.description,
            order: OrderDraft {
                location_id: config.location_id.clone(),
                line_items: vec![LineItem {
                    name: pricing.name,
                    quantity: "1".into(),
                    base_price_money: Money {
                        amount: pricing.cents,
                        currency: Currency::USD,
                    },
                }],
                metadata,
            },
            checkout_options: CheckoutOptions {
                allow_tipping: false,
                redirect_url: config.success_url.clone(),
                ask_for_shipping_address: false,
            },
        }
    }
}

/// Result of creating a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider payment link id
    pub id: String,

    /// URL to redirect user to
    pub url: String,

    /// Plan being purchased
    pub plan: Plan,
}

/// Creates payment links through a [`PaymentProvider`]
#[derive(Clone)]
pub struct CheckoutService {
    provider: Arc<dyn PaymentProvider>,
    config: CheckoutConfig,
}

impl CheckoutService {
    pub fn new(provider: Arc<dyn PaymentProvider>, config: CheckoutConfig) -> Self {
        Self { provider, config }
    }

    /// Create a hosted payment link for `request`
    ///
    /// Returns the link URL exactly as the provider issued it.
    pub async fn create_checkout_session(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        let params = request.to_payment_link_request(&self.config, Utc::now());

        tracing::debug!(
            user_id = %request.user_id,
            plan = %request.plan,
            idempotency_key = %params.idempotency_key,
            "Creating payment link"
        );

        let link = self.provider.create_payment_link(params).await?;

        tracing::info!(
            user_id = %request.user_id,
            plan = %request.plan,
            payment_link_id = %link.id,
            order_id = ?link.order_id,
            "Created payment link"
        );

        Ok(CheckoutSession {
            id: link.id,
            url: link.url,
            plan: request.plan,
        })
    }
}
