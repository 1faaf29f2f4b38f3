//! Server Configuration
//!
//! Everything is read from the environment once at startup; a `.env` file is
//! honoured via `dotenvy`.

use anyhow::Context;

use synapse_payments::{CheckoutConfig, FirestoreConfig, SquareConfig, WebhookVerifier};

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub audience: Option<String>,
}

impl AuthConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            jwt_secret: std::env::var("AUTH_JWT_SECRET").context("AUTH_JWT_SECRET not set")?,
            audience: std::env::var("AUTH_JWT_AUDIENCE").ok(),
        })
    }
}

/// Where user plans are written
#[derive(Clone, Debug)]
pub enum StoreConfig {
    Firestore(FirestoreConfig),
    /// Process-local and empty at start; only for local development
    Memory,
}

impl StoreConfig {
    /// `USER_STORE` selects the backend, defaulting to `firestore`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::resolve(std::env::var("USER_STORE").ok().as_deref(), FirestoreConfig::from_env())
    }

    /// The in-memory store is never chosen implicitly: a missing Firestore
    /// project is an error unless `memory` was asked for.
    pub fn resolve(backend: Option<&str>, firestore: Option<FirestoreConfig>) -> anyhow::Result<Self> {
        match backend.map(str::trim).unwrap_or("firestore") {
            "firestore" => firestore
                .map(Self::Firestore)
                .context("FIRESTORE_PROJECT_ID not set (set USER_STORE=memory for local development)"),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown USER_STORE {other:?} (expected firestore or memory)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub auth: AuthConfig,
    pub square: SquareConfig,
    pub checkout: CheckoutConfig,
    pub store: StoreConfig,
    /// `None` trusts webhook payloads unverified
    pub webhook_verifier: Option<WebhookVerifier>,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into()),
            auth: AuthConfig::from_env()?,
            square: SquareConfig::from_env()?,
            checkout: CheckoutConfig::from_env()?,
            store: StoreConfig::from_env()?,
            webhook_verifier: WebhookVerifier::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_defaults_to_firestore() {
        let config = StoreConfig::resolve(None, Some(FirestoreConfig::new("synapse-prod"))).unwrap();
        assert!(matches!(config, StoreConfig::Firestore(f) if f.project_id == "synapse-prod"));
    }

    #[test]
    fn test_missing_firestore_project_refuses_to_start() {
        let err = StoreConfig::resolve(None, None).unwrap_err();
        assert!(err.to_string().contains("FIRESTORE_PROJECT_ID"));
        assert!(StoreConfig::resolve(Some("firestore"), None).is_err());
    }

    #[test]
    fn test_memory_store_is_opt_in() {
        assert!(matches!(StoreConfig::resolve(Some("memory"), None).unwrap(), StoreConfig::Memory));
        let with_project = StoreConfig::resolve(Some("memory"), Some(FirestoreConfig::new("p"))).unwrap();
        assert!(matches!(with_project, StoreConfig::Memory));
    }

    #[test]
    fn test_unknown_store_rejected() {
        assert!(StoreConfig::resolve(Some("postgres"), None).is_err());
    }
}
