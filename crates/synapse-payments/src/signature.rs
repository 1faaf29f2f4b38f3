//! Webhook Signature Verification
//!
//! Square signs each notification with
//! `base64(HMAC-SHA256(signature_key, notification_url || body))` and sends it
//! in the `x-square-hmacsha256-signature` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the notification signature
pub const SIGNATURE_HEADER: &str = "x-square-hmacsha256-signature";

/// Verifies notification signatures for one subscription endpoint
#[derive(Clone)]
pub struct WebhookVerifier {
    signature_key: String,
    notification_url: String,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("notification_url", &self.notification_url)
            .finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    pub fn new(signature_key: impl Into<String>, notification_url: impl Into<String>) -> Self {
        Self {
            signature_key: signature_key.into(),
            notification_url: notification_url.into(),
        }
    }

    /// Create from environment variables
    ///
    /// Returns `Ok(None)` when no signature key is configured.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(signature_key) = std::env::var("SQUARE_WEBHOOK_SIGNATURE_KEY") else {
            return Ok(None);
        };
        let notification_url = std::env::var("SQUARE_WEBHOOK_URL").map_err(|_| {
            PaymentError::Config(
                "SQUARE_WEBHOOK_URL must be set when SQUARE_WEBHOOK_SIGNATURE_KEY is".into(),
            )
        })?;

        Ok(Some(Self::new(signature_key, notification_url)))
    }

    fn mac(&self, payload: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.signature_key.as_bytes())
            .map_err(|e| PaymentError::Config(format!("webhook signature key: {e}")))?;
        mac.update(self.notification_url.as_bytes());
        mac.update(payload);
        Ok(mac)
    }

    /// Signature Square would send for `payload`
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        Ok(STANDARD.encode(self.mac(payload)?.finalize().into_bytes()))
    }

    /// Check `signature` against `payload` in constant time
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<()> {
        let provided = STANDARD
            .decode(signature.trim())
            .map_err(|_| PaymentError::WebhookSignature("signature is not base64".into()))?;

        self.mac(payload)?
            .verify_slice(&provided)
            .map_err(|_| PaymentError::WebhookSignature("signature mismatch".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://example.com/webhooks/square";

    #[test]
    fn test_valid_signature_accepted() {
        let verifier = WebhookVerifier::new("key", URL);
        let body = br#"{"type":"payment.updated"}"#;
        let signature = verifier.sign(body).unwrap();

        assert!(verifier.verify(body, &signature).is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let verifier = WebhookVerifier::new("key", URL);
        let signature = verifier.sign(br#"{"amount":1}"#).unwrap();

        let err = verifier.verify(br#"{"amount":2}"#, &signature).unwrap_err();
        assert!(matches!(err, PaymentError::WebhookSignature(_)));
    }

    #[test]
    fn test_url_is_part_of_signature() {
        let body = b"{}";
        let signature = WebhookVerifier::new("key", "https://other.example/hook").sign(body).unwrap();

        assert!(WebhookVerifier::new("key", URL).verify(body, &signature).is_err());
    }

    #[test]
    fn test_garbage_signature_rejected() {
        let verifier = WebhookVerifier::new("key", URL);
        assert!(verifier.verify(b"{}", "not base64!!").is_err());
        assert!(verifier.verify(b"{}", "").is_err());
    }
}
