//! Payment Provider Abstraction
//!
//! The two provider operations this service relies on, plus the request and
//! response shapes they exchange. Field names follow Square's Connect v2 API
//! so the types serialize straight onto the wire.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;

/// Metadata key carrying the purchasing user's id
pub const METADATA_USER_ID: &str = "userId";

/// Metadata key carrying the plan selector
pub const METADATA_PLAN: &str = "plan";

/// Payment provider trait
///
/// Implemented by [`crate::SquareClient`]; tests substitute recording fakes.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a hosted payment link
    async fn create_payment_link(&self, request: PaymentLinkRequest) -> Result<PaymentLink>;

    /// Fetch an order by id
    async fn retrieve_order(&self, order_id: &str) -> Result<Order>;
}

/// Currency code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    USD,
}

/// Amount in minor currency units
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: Currency,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Square expects quantities as decimal strings
    pub quantity: String,
    pub base_price_money: Money,
}

/// Order created alongside the payment link
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub location_id: String,
    pub line_items: Vec<LineItem>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutOptions {
    pub allow_tipping: bool,
    pub redirect_url: String,
    pub ask_for_shipping_address: bool,
}

/// Body of a create-payment-link call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLinkRequest {
    pub idempotency_key: String,
    pub description: String,
    pub order: OrderDraft,
    pub checkout_options: CheckoutOptions,
}

/// Created payment link
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Order as returned by the provider
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl Order {
    /// Non-empty metadata value for `key`
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_metadata_lookup() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": "ord_1",
            "metadata": { "userId": "u1", "plan": "" }
        }))
        .unwrap();

        assert_eq!(order.metadata_value(METADATA_USER_ID), Some("u1"));
        assert_eq!(order.metadata_value(METADATA_PLAN), None);
        assert_eq!(order.metadata_value("missing"), None);
    }

    #[test]
    fn test_order_without_metadata() {
        let order: Order = serde_json::from_value(serde_json::json!({ "id": "ord_2" })).unwrap();
        assert!(order.metadata.is_none());
        assert_eq!(order.metadata_value(METADATA_USER_ID), None);
    }
}
