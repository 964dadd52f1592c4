use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::{
    env_config::RazorpayConfig,
    error::{AppError, Res},
};

type HmacSha256 = Hmac<Sha256>;

const API_BASE: &str = "https://api.razorpay.com/v1";

/// Thin client for the Razorpay REST API.
///
/// Only the payment-link resource is used: the service creates a hosted
/// checkout page per upgrade attempt and correlates the eventual webhook
/// through the `notes` metadata embedded here.
pub struct RazorpayClient {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
    webhook_secret: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentLinkCustomer {
    pub name: String,
    pub email: String,
}

/// Metadata round-tripped through the gateway. `session` correlates the
/// link with the `last_payment_attempt` token stored for the user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentNotes {
    pub uid: String,
    pub session: String,
}

#[derive(Debug, Serialize)]
pub struct CreatePaymentLink {
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub customer: PaymentLinkCustomer,
    pub notes: PaymentNotes,
}

#[derive(Debug, Deserialize)]
pub struct PaymentLink {
    pub id: String,
    pub short_url: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        RazorpayClient {
            client: reqwest::Client::new(),
            base_url: API_BASE.to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Creates a hosted payment-link resource and returns its checkout URL.
    pub async fn create_payment_link(&self, req: &CreatePaymentLink) -> Res<PaymentLink> {
        let response = self
            .client
            .post(format!("{}/payment_links", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(req)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            log::error!("Payment link creation failed with {}: {}", status, body);
            return Err(AppError::Gateway(format!(
                "payment link creation returned {}",
                status
            )));
        }

        response.json::<PaymentLink>().await.map_err(AppError::from)
    }

    /// Verifies the `X-Razorpay-Signature` header against the raw webhook
    /// body. The signature is the lowercase hex HMAC-SHA256 of the body
    /// under the webhook secret. Nothing in the payload may be trusted
    /// before this check passes.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Res<()> {
        let provided = hex::decode(signature.trim())
            .map_err(|_| AppError::BadRequest("Malformed webhook signature".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|e| AppError::Internal(format!("Failed to init webhook HMAC: {}", e)))?;
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        if expected.ct_eq(provided.as_slice()).into() {
            Ok(())
        } else {
            Err(AppError::BadRequest(
                "Webhook signature mismatch".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> RazorpayClient {
        RazorpayClient::new(&RazorpayConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: "rzp_test_secret".to_string(),
            webhook_secret: "whsec_test123".to_string(),
        })
    }

    fn sign(payload: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_is_accepted() {
        let client = test_client();
        let payload = br#"{"event":"payment.captured"}"#;
        let signature = sign(payload, "whsec_test123");

        assert!(client.verify_webhook_signature(payload, &signature).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let client = test_client();
        let payload = br#"{"event":"payment.captured"}"#;
        let signature = sign(payload, "some_other_secret");

        assert!(client.verify_webhook_signature(payload, &signature).is_err());
    }

    #[test]
    fn modified_payload_is_rejected() {
        let client = test_client();
        let payload = br#"{"event":"payment.captured"}"#;
        let signature = sign(payload, "whsec_test123");
        let tampered = br#"{"event":"payment.captured","extra":true}"#;

        assert!(client.verify_webhook_signature(tampered, &signature).is_err());
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        let client = test_client();
        let payload = br#"{}"#;

        assert!(
            client
                .verify_webhook_signature(payload, "not-a-hex-string")
                .is_err()
        );
    }
}
