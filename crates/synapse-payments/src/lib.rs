//! # synapse-payments
//!
//! Plan purchases for synapse, backed by Square hosted payment links.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐  payment link   ┌─────────────────┐  redirect  ┌──────────────┐
//! │  Client     │────────────────▶│  Square Hosted  │───────────▶│ success page │
//! │  (pricing)  │                 │  Checkout Page  │            └──────────────┘
//! └─────────────┘                 └────────┬────────┘
//!                                          │ payment.updated (COMPLETED)
//!                                          ▼
//!                                 ┌─────────────────┐ retrieve order ┌──────────┐
//!                                 │ WebhookHandler  │───────────────▶│  Square  │
//!                                 └────────┬────────┘                └──────────┘
//!                                          │ users/{userId}.plan = "OPERATIVE"
//!                                          ▼
//!                                 ┌─────────────────┐
//!                                 │    UserStore    │
//!                                 └─────────────────┘
//! ```
//!
//! The user id and plan selector ride along as order metadata, which is the
//! only link between the checkout request and the later notification.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use synapse_payments::{CheckoutConfig, CheckoutRequest, CheckoutService, Plan, SquareClient};
//!
//! let provider = Arc::new(SquareClient::from_env()?);
//! let checkout = CheckoutService::new(provider, CheckoutConfig::from_env()?);
//!
//! let session = checkout.create_checkout_session(CheckoutRequest {
//!     user_id: "u1".into(),
//!     plan: Plan::Operative,
//! }).await?;
//!
//! // Redirect user to: session.url
//! ```

mod checkout;
mod error;
mod plan;
mod provider;
mod signature;
mod square;
mod store;
mod webhook;

pub use checkout::{CheckoutConfig, CheckoutRequest, CheckoutService, CheckoutSession, DEFAULT_SUCCESS_URL};
pub use error::{PaymentError, Result};
pub use plan::{Plan, PlanPricing};
pub use provider::{
    CheckoutOptions, Currency, LineItem, METADATA_PLAN, METADATA_USER_ID, Money, Order, OrderDraft,
    PaymentLink, PaymentLinkRequest, PaymentProvider,
};
pub use signature::{SIGNATURE_HEADER, WebhookVerifier};
pub use square::{SquareClient, SquareConfig, SquareEnvironment};
pub use store::{
    AccessTokenSource, DATASTORE_SCOPE, FirestoreConfig, FirestoreUserStore, GcpTokenSource, MemoryUserStore,
    UserRecord, UserStore,
};
pub use webhook::{WebhookEvent, WebhookHandler, WebhookOutcome};
