//! User Plan Storage
//!
//! The `users` document collection. The only write this service performs is a
//! point update of a user's `plan` field.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::{PaymentError, Result};

/// Collection holding user documents
pub const USERS_COLLECTION: &str = "users";

/// A user document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,

    /// Upper-cased plan name, e.g. "OPERATIVE"
    pub plan: String,
}

impl UserRecord {
    pub fn new(id: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plan: plan.into(),
        }
    }
}

/// User storage trait
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Set the `plan` field of an existing user document
    ///
    /// Fails with [`PaymentError::UserNotFound`] when no document exists.
    async fn update_plan(&self, user_id: &str, plan: &str) -> Result<()>;

    /// Backend name for diagnostics
    fn backend(&self) -> &'static str;
}

/// In-memory user store (for development)
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user document
    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    pub async fn get(&self, user_id: &str) -> Option<UserRecord> {
        self.users.read().await.get(user_id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn update_plan(&self, user_id: &str, plan: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| PaymentError::UserNotFound(user_id.to_string()))?;
        user.plan = plan.to_string();
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// OAuth scope for Firestore document access
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Source of short-lived OAuth access tokens
///
/// Asked once per request; implementations cache and refresh.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Google application-default credentials (service account, metadata server
/// or gcloud user), cached and refreshed by `gcp_auth`
pub struct GcpTokenSource {
    provider: Arc<dyn gcp_auth::TokenProvider>,
}

impl GcpTokenSource {
    pub async fn new() -> Result<Self> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| PaymentError::Config(format!("Google credentials: {e}")))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl AccessTokenSource for GcpTokenSource {
    async fn access_token(&self) -> Result<String> {
        let token = self
            .provider
            .token(&[DATASTORE_SCOPE])
            .await
            .map_err(|e| PaymentError::Storage(format!("access token: {e}")))?;
        Ok(token.as_str().to_string())
    }
}

/// Firestore connection settings
#[derive(Clone, Debug)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    /// REST root, overridable for the emulator
    pub base_url: String,
}

impl FirestoreConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: "(default)".into(),
            base_url: "https://firestore.googleapis.com/v1/".into(),
        }
    }

    /// Create from environment variables
    ///
    /// Returns `None` when no project is configured.
    pub fn from_env() -> Option<Self> {
        let project_id = std::env::var("FIRESTORE_PROJECT_ID").ok()?;
        let mut config = Self::new(project_id);
        if let Ok(base_url) = std::env::var("FIRESTORE_BASE_URL") {
            config.base_url = base_url;
        }
        Some(config)
    }
}

/// Firestore-backed user store using the REST API
pub struct FirestoreUserStore {
    http: Client,
    config: FirestoreConfig,
    tokens: Arc<dyn AccessTokenSource>,
}

impl FirestoreUserStore {
    pub fn new(config: FirestoreConfig, tokens: Arc<dyn AccessTokenSource>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { http, config, tokens })
    }

    /// Document URL for a user, with the id percent-encoded as one segment
    fn document_url(&self, user_id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| PaymentError::Config(format!("Firestore base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| PaymentError::Config("invalid Firestore base URL".into()))?
            .pop_if_empty()
            .extend([
                "projects",
                self.config.project_id.as_str(),
                "databases",
                self.config.database.as_str(),
                "documents",
                USERS_COLLECTION,
                user_id,
            ]);
        Ok(url)
    }
}

#[async_trait]
impl UserStore for FirestoreUserStore {
    async fn update_plan(&self, user_id: &str, plan: &str) -> Result<()> {
        let url = self.document_url(user_id)?;
        let token = self.tokens.access_token().await?;
        let body = serde_json::json!({
            "fields": { "plan": { "stringValue": plan } }
        });

        let response = self
            .http
            .patch(url)
            .bearer_auth(token)
            .query(&[
                ("updateMask.fieldPaths", "plan"),
                ("currentDocument.exists", "true"),
            ])
            .json(&body)
            .send()
            .await
            .map_err(|e| PaymentError::Storage(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(PaymentError::UserNotFound(user_id.to_string())),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(PaymentError::Storage(format!("Firestore HTTP {status}: {text}")))
            }
        }
    }

    fn backend(&self) -> &'static str {
        "firestore"
    }
}
