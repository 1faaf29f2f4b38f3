//! Square Connect Client
//!
//! Thin REST client over the payment-link and orders endpoints.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{PaymentError, Result};
use crate::provider::{Order, PaymentLink, PaymentLinkRequest, PaymentProvider};

/// API version pinned in the `Square-Version` header
pub const SQUARE_API_VERSION: &str = "2024-01-18";

/// Square deployment environment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SquareEnvironment {
    #[default]
    Production,
    Sandbox,
}

impl SquareEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            SquareEnvironment::Production => "https://connect.squareup.com",
            SquareEnvironment::Sandbox => "https://connect.squareupsandbox.com",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "production" => Ok(SquareEnvironment::Production),
            "sandbox" => Ok(SquareEnvironment::Sandbox),
            other => Err(PaymentError::Config(format!(
                "SQUARE_ENVIRONMENT must be 'production' or 'sandbox', got '{other}'"
            ))),
        }
    }
}

/// Square client configuration
#[derive(Clone, Debug)]
pub struct SquareConfig {
    pub access_token: String,
    pub environment: SquareEnvironment,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl SquareConfig {
    pub fn new(access_token: impl Into<String>, environment: SquareEnvironment) -> Self {
        Self {
            access_token: access_token.into(),
            environment,
            timeout_secs: 30,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let access_token = std::env::var("SQUARE_ACCESS_TOKEN")
            .map_err(|_| PaymentError::Config("SQUARE_ACCESS_TOKEN not set".into()))?;
        let environment = match std::env::var("SQUARE_ENVIRONMENT") {
            Ok(value) => SquareEnvironment::parse(&value)?,
            Err(_) => SquareEnvironment::default(),
        };

        Ok(Self::new(access_token, environment))
    }
}

#[derive(Debug, Deserialize)]
struct SquareApiError {
    category: String,
    code: String,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePaymentLinkResponse {
    payment_link: Option<PaymentLink>,
}

#[derive(Debug, Deserialize)]
struct RetrieveOrderResponse {
    order: Option<Order>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<SquareApiError>,
}

/// Square REST client
pub struct SquareClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl SquareClient {
    pub fn new(config: &SquareConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.environment.base_url().to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(&SquareConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .bearer_auth(&self.access_token)
            .header("Square-Version", SQUARE_API_VERSION)
            .send()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::Provider(e.to_string()))?;

        if !status.is_success() {
            return Err(PaymentError::Provider(describe_failure(status, &body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| PaymentError::Provider(format!("unexpected response body: {e}")))
    }
}

fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    let errors = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.errors)
        .unwrap_or_default();

    if errors.is_empty() {
        return format!("HTTP {status}");
    }

    let details: Vec<String> = errors
        .iter()
        .map(|e| match &e.detail {
            Some(detail) => format!("{}/{}: {}", e.category, e.code, detail),
            None => format!("{}/{}", e.category, e.code),
        })
        .collect();
    format!("HTTP {status}: {}", details.join("; "))
}

#[async_trait]
impl PaymentProvider for SquareClient {
    async fn create_payment_link(&self, request: PaymentLinkRequest) -> Result<PaymentLink> {
        let response: CreatePaymentLinkResponse = self
            .send(
                self.http
                    .post(self.url("/v2/online-checkout/payment-links"))
                    .json(&request),
            )
            .await?;

        response
            .payment_link
            .ok_or_else(|| PaymentError::Provider("No payment link returned".into()))
    }

    async fn retrieve_order(&self, order_id: &str) -> Result<Order> {
        let response: RetrieveOrderResponse = self
            .send(self.http.get(self.url(&format!("/v2/orders/{order_id}"))))
            .await?;

        response
            .order
            .ok_or_else(|| PaymentError::Provider(format!("Order {order_id} missing from response")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!(SquareEnvironment::parse("Sandbox").unwrap(), SquareEnvironment::Sandbox);
        assert_eq!(
            SquareEnvironment::parse("production").unwrap().base_url(),
            "https://connect.squareup.com"
        );
        assert!(SquareEnvironment::parse("staging").is_err());
    }

    #[test]
    fn test_failure_description_lists_square_errors() {
        let body = r#"{"errors":[{"category":"AUTHENTICATION_ERROR","code":"UNAUTHORIZED","detail":"bad token"}]}"#;
        let message = describe_failure(reqwest::StatusCode::UNAUTHORIZED, body);
        assert!(message.contains("401"));
        assert!(message.contains("AUTHENTICATION_ERROR/UNAUTHORIZED: bad token"));
    }

    #[test]
    fn test_failure_description_without_body() {
        let message = describe_failure(reqwest::StatusCode::BAD_GATEWAY, "<html>");
        assert_eq!(message, "HTTP 502 Bad Gateway");
    }
}
