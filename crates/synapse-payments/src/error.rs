//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Square API error
    #[error("Square error: {0}")]
    Provider(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Plan selector outside the catalogue
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// No user document for the given id
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Document store error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            PaymentError::Provider(_) => "Could not create checkout link.",
            PaymentError::InvalidPlan(_) => "Invalid plan specified.",
            PaymentError::WebhookSignature(_) => "Invalid signature.",
            PaymentError::UserNotFound(_) => "User not found.",
            PaymentError::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_details_stay_out_of_user_message() {
        let err = PaymentError::Provider("UNAUTHORIZED: bad token sq0atp-123".into());
        assert!(!err.user_message().contains("sq0atp"));
        assert!(err.to_string().contains("sq0atp"));
    }
}
