//! Square Webhook Handling
//!
//! Processes payment notifications and upgrades the purchasing user's plan.
//! Processing never fails outward: every problem becomes a logged
//! [`WebhookOutcome`], so the provider is not provoked into redelivery.

use serde::Deserialize;
use std::sync::Arc;

use crate::error::{PaymentError, Result};
use crate::provider::{METADATA_PLAN, METADATA_USER_ID, PaymentProvider};
use crate::store::UserStore;

/// Event type that carries payment state changes
pub const PAYMENT_UPDATED: &str = "payment.updated";

/// Payment status that triggers an upgrade
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// Inbound notification payload
#[derive(Clone, Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub event_id: Option<String>,

    #[serde(default)]
    pub data: Option<EventData>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: Option<EventObject>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventObject {
    #[serde(default)]
    pub payment: Option<Payment>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

impl WebhookEvent {
    /// Embedded payment object, if any
    pub fn payment(&self) -> Option<&Payment> {
        self.data
            .as_ref()
            .and_then(|d| d.object.as_ref())
            .and_then(|o| o.payment.as_ref())
    }
}

/// What processing a notification amounted to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a payment update
    Ignored { event_type: String },

    /// Payment update in a state other than completed
    PaymentNotCompleted { status: String },

    /// Payload could not be interpreted
    Malformed { reason: String },

    /// Order carried no user/plan metadata
    MissingMetadata { order_id: String },

    /// Plan stored on the user
    PlanUpgraded { user_id: String, plan: String },

    /// Order lookup or store update failed; the upgrade was dropped.
    /// `user_id`/`plan` are known once the order was read.
    Failed {
        order_id: String,
        user_id: Option<String>,
        plan: Option<String>,
        error: String,
    },
}

/// Webhook handler
pub struct WebhookHandler {
    provider: Arc<dyn PaymentProvider>,
    store: Arc<dyn UserStore>,
}

impl WebhookHandler {
    pub fn new(provider: Arc<dyn PaymentProvider>, store: Arc<dyn UserStore>) -> Self {
        Self { provider, store }
    }

    /// Parse a raw notification body
    pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent> {
        serde_json::from_slice(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))
    }

    /// Parse and handle a raw notification body
    pub async fn process(&self, payload: &[u8]) -> WebhookOutcome {
        match Self::parse_event(payload) {
            Ok(event) => self.handle(event).await,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable webhook payload");
                WebhookOutcome::Malformed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Process a webhook event
    pub async fn handle(&self, event: WebhookEvent) -> WebhookOutcome {
        tracing::info!(
            event_type = %event.event_type,
            event_id = ?event.event_id,
            "Processing Square webhook"
        );

        if event.event_type != PAYMENT_UPDATED {
            tracing::debug!(event_type = %event.event_type, "Unhandled webhook event");
            return WebhookOutcome::Ignored {
                event_type: event.event_type,
            };
        }

        let Some(payment) = event.payment() else {
            tracing::warn!(event_id = ?event.event_id, "payment.updated without payment object");
            return WebhookOutcome::Malformed {
                reason: "missing data.object.payment".into(),
            };
        };

        if payment.status != STATUS_COMPLETED {
            tracing::debug!(payment_id = ?payment.id, status = %payment.status, "Payment not completed");
            return WebhookOutcome::PaymentNotCompleted {
                status: payment.status.clone(),
            };
        }

        let Some(order_id) = payment.order_id.as_deref().filter(|id| !id.is_empty()) else {
            tracing::warn!(payment_id = ?payment.id, "Completed payment without order id");
            return WebhookOutcome::Malformed {
                reason: "missing payment.order_id".into(),
            };
        };

        self.upgrade_from_order(order_id).await
    }

    async fn upgrade_from_order(&self, order_id: &str) -> WebhookOutcome {
        let order = match self.provider.retrieve_order(order_id).await {
            Ok(order) => order,
            Err(e) => return failed(order_id, None, &e),
        };

        let (Some(user_id), Some(plan)) = (
            order.metadata_value(METADATA_USER_ID),
            order.metadata_value(METADATA_PLAN),
        ) else {
            tracing::warn!(order_id = %order_id, "Order has no userId/plan metadata");
            return WebhookOutcome::MissingMetadata {
                order_id: order_id.to_string(),
            };
        };

        let plan = plan.to_uppercase();
        if let Err(e) = self.store.update_plan(user_id, &plan).await {
            return failed(order_id, Some((user_id, plan.as_str())), &e);
        }

        tracing::info!(user_id = %user_id, plan = %plan, order_id = %order_id, "Upgraded user plan");
        WebhookOutcome::PlanUpgraded {
            user_id: user_id.to_string(),
            plan,
        }
    }
}

/// Log a dropped upgrade once, with everything needed to replay it by hand
fn failed(order_id: &str, target: Option<(&str, &str)>, error: &PaymentError) -> WebhookOutcome {
    let user_id = target.map(|(user_id, _)| user_id.to_string());
    let plan = target.map(|(_, plan)| plan.to_string());

    tracing::error!(
        order_id = %order_id,
        user_id = ?user_id,
        plan = ?plan,
        error = %error,
        "Error processing webhook"
    );

    WebhookOutcome::Failed {
        order_id: order_id.to_string(),
        user_id,
        plan,
        error: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Order, PaymentLink, PaymentLinkRequest};
    use crate::store::{MemoryUserStore, UserRecord};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// Serves one canned order, or fails every lookup
    struct FakeProvider {
        order: Option<Order>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn with_metadata(pairs: &[(&str, &str)]) -> Self {
            let metadata: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect();
            Self {
                order: Some(Order {
                    id: "ord_1".into(),
                    metadata: Some(metadata),
                }),
                lookups: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                order: None,
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaymentProvider for FakeProvider {
        async fn create_payment_link(&self, _request: PaymentLinkRequest) -> Result<PaymentLink> {
            unreachable!("webhooks never create links")
        }

        async fn retrieve_order(&self, order_id: &str) -> Result<Order> {
            self.lookups.lock().await.push(order_id.to_string());
            self.order
                .clone()
                .ok_or_else(|| PaymentError::Provider("NOT_FOUND".into()))
        }
    }

    fn payload(event_type: &str, status: &str) -> Vec<u8> {
        serde_json::json!({
            "type": event_type,
            "event_id": "evt_1",
            "data": { "object": { "payment": {
                "id": "pay_1",
                "status": status,
                "order_id": "ord_1"
            } } }
        })
        .to_string()
        .into_bytes()
    }

    async fn setup(provider: FakeProvider) -> (WebhookHandler, Arc<FakeProvider>, Arc<MemoryUserStore>) {
        let provider = Arc::new(provider);
        let store = Arc::new(MemoryUserStore::new());
        store.insert(UserRecord::new("u1", "FREE")).await;
        (WebhookHandler::new(provider.clone(), store.clone()), provider, store)
    }

    #[tokio::test]
    async fn test_completed_payment_upgrades_plan() {
        let (handler, provider, store) =
            setup(FakeProvider::with_metadata(&[("userId", "u1"), ("plan", "operative")])).await;

        let outcome = handler.process(&payload(PAYMENT_UPDATED, "COMPLETED")).await;

        assert_eq!(
            outcome,
            WebhookOutcome::PlanUpgraded {
                user_id: "u1".into(),
                plan: "OPERATIVE".into()
            }
        );
        assert_eq!(store.get("u1").await.unwrap().plan, "OPERATIVE");
        assert_eq!(*provider.lookups.lock().await, vec!["ord_1".to_string()]);
    }

    #[tokio::test]
    async fn test_pending_payment_is_not_processed() {
        let (handler, provider, store) =
            setup(FakeProvider::with_metadata(&[("userId", "u1"), ("plan", "godmode")])).await;

        let outcome = handler.process(&payload(PAYMENT_UPDATED, "APPROVED")).await;

        assert_eq!(outcome, WebhookOutcome::PaymentNotCompleted { status: "APPROVED".into() });
        assert_eq!(store.get("u1").await.unwrap().plan, "FREE");
        assert!(provider.lookups.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_other_event_types_ignored() {
        let (handler, provider, _store) =
            setup(FakeProvider::with_metadata(&[("userId", "u1"), ("plan", "godmode")])).await;

        let outcome = handler.process(&payload("payment.created", "COMPLETED")).await;

        assert!(matches!(outcome, WebhookOutcome::Ignored { event_type } if event_type == "payment.created"));
        assert!(provider.lookups.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_order_lookup_failure_is_swallowed() {
        let (handler, _provider, store) = setup(FakeProvider::failing()).await;

        let outcome = handler.process(&payload(PAYMENT_UPDATED, "COMPLETED")).await;

        assert!(matches!(
            outcome,
            WebhookOutcome::Failed { order_id, user_id: None, plan: None, .. } if order_id == "ord_1"
        ));
        assert_eq!(store.get("u1").await.unwrap().plan, "FREE");
    }

    #[tokio::test]
    async fn test_missing_metadata_leaves_user_untouched() {
        let (handler, _provider, store) = setup(FakeProvider::with_metadata(&[("userId", "u1")])).await;

        let outcome = handler.process(&payload(PAYMENT_UPDATED, "COMPLETED")).await;

        assert_eq!(outcome, WebhookOutcome::MissingMetadata { order_id: "ord_1".into() });
        assert_eq!(store.get("u1").await.unwrap().plan, "FREE");
    }

    #[tokio::test]
    async fn test_unknown_user_reported_as_failure() {
        let (handler, _provider, _store) =
            setup(FakeProvider::with_metadata(&[("userId", "ghost"), ("plan", "godmode")])).await;

        let outcome = handler.process(&payload(PAYMENT_UPDATED, "COMPLETED")).await;

        assert!(matches!(
            outcome,
            WebhookOutcome::Failed { user_id: Some(user_id), plan: Some(plan), .. }
                if user_id == "ghost" && plan == "GODMODE"
        ));
    }

    #[tokio::test]
    async fn test_malformed_payloads() {
        let (handler, provider, _store) = setup(FakeProvider::failing()).await;

        assert!(matches!(handler.process(b"not json").await, WebhookOutcome::Malformed { .. }));
        let no_payment = br#"{"type":"payment.updated","data":{"object":{}}}"#;
        assert!(matches!(handler.process(no_payment).await, WebhookOutcome::Malformed { .. }));
        assert!(provider.lookups.lock().await.is_empty());
    }
}
