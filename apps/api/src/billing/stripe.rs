//! Stripe integration: checkout session creation over the form-encoded
//! REST API, and webhook signature verification.
//!
//! The webhook secret signs `"{timestamp}.{payload}"` with HMAC-SHA256;
//! the `Stripe-Signature` header carries the timestamp and one or more
//! `v1=` candidate signatures. Verification is constant-time and bounds
//! the timestamp skew to defeat replay.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";
/// Maximum accepted age of a signed webhook event.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("malformed Stripe-Signature header")]
    MalformedHeader,
    #[error("webhook timestamp outside tolerance")]
    TimestampOutOfTolerance,
    #[error("no matching v1 signature")]
    NoMatchingSignature,
}

/// Verifies a `Stripe-Signature` header against the raw request body.
/// `now_unix` is injected so the tolerance window is testable.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    for candidate in candidates {
        let Ok(candidate) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        if mac.verify_slice(&candidate).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::NoMatchingSignature)
}

/// Webhook event envelope — only the fields the service consumes.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: CheckoutSessionObject,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSessionObject {
    pub id: String,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// What a checkout session is buying.
#[derive(Debug, Clone)]
pub enum CheckoutKind {
    /// One $7 roast, redeemed via the session token itself.
    SingleRoast,
    /// A credit pack; the webhook tops up the account named in metadata.
    Pack { plan: String, email: String },
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: String,
}

/// Thin client for the Stripe REST API. Checkout sessions are the only
/// surface this service touches; webhook verification is stateless and
/// lives above.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            secret_key,
        }
    }

    pub async fn create_checkout_session(
        &self,
        kind: &CheckoutKind,
        public_url: &str,
    ) -> Result<CheckoutSession, AppError> {
        let mut form: Vec<(String, String)> = vec![
            ("payment_method_types[0]".into(), "card".into()),
            ("mode".into(), "payment".into()),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "line_items[0][price_data][currency]".into(),
                "usd".into(),
            ),
            (
                "cancel_url".into(),
                format!("{public_url}/checkout"),
            ),
        ];

        match kind {
            CheckoutKind::SingleRoast => {
                form.extend([
                    (
                        "line_items[0][price_data][product_data][name]".into(),
                        "Resume Roast".into(),
                    ),
                    (
                        "line_items[0][price_data][product_data][description]".into(),
                        "Get brutally honest AI feedback on why you didn't get the job".into(),
                    ),
                    ("line_items[0][price_data][unit_amount]".into(), "700".into()),
                    (
                        "success_url".into(),
                        format!("{public_url}/analyze?session_id={{CHECKOUT_SESSION_ID}}"),
                    ),
                ]);
            }
            CheckoutKind::Pack { plan, email } => {
                let (name, amount) = match plan.as_str() {
                    "pro" => ("Roast Credits — Pro Pack (50 roasts)", "4900"),
                    _ => ("Roast Credits — Starter Pack (10 roasts)", "1900"),
                };
                form.extend([
                    (
                        "line_items[0][price_data][product_data][name]".into(),
                        name.into(),
                    ),
                    (
                        "line_items[0][price_data][unit_amount]".into(),
                        amount.into(),
                    ),
                    (
                        "success_url".into(),
                        format!("{public_url}/dashboard?purchase=success"),
                    ),
                    ("metadata[plan]".into(), plan.clone()),
                    ("metadata[email]".into(), email.clone()),
                ]);
            }
        }

        let response = self
            .client
            .post(CHECKOUT_SESSIONS_URL)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("checkout session request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(AppError::Payment(format!(
                "checkout session rejected ({status}): {message}"
            )));
        }

        let session: CheckoutSession = response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("unreadable checkout session: {e}")))?;

        debug!(session_id = session.id, "checkout session created");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_passes() {
        let t = 1_700_000_000;
        let header = format!("t={t},v1={}", sign(PAYLOAD, SECRET, t));
        assert_eq!(verify_webhook_signature(PAYLOAD, &header, SECRET, t + 10), Ok(()));
    }

    #[test]
    fn test_secondary_v1_candidate_passes() {
        let t = 1_700_000_000;
        let header = format!("t={t},v1=deadbeef,v1={}", sign(PAYLOAD, SECRET, t));
        assert_eq!(verify_webhook_signature(PAYLOAD, &header, SECRET, t), Ok(()));
    }

    #[test]
    fn test_tampered_payload_fails() {
        let t = 1_700_000_000;
        let header = format!("t={t},v1={}", sign(PAYLOAD, SECRET, t));
        assert_eq!(
            verify_webhook_signature(b"{}", &header, SECRET, t),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn test_wrong_secret_fails() {
        let t = 1_700_000_000;
        let header = format!("t={t},v1={}", sign(PAYLOAD, "whsec_other", t));
        assert_eq!(
            verify_webhook_signature(PAYLOAD, &header, SECRET, t),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let t = 1_700_000_000;
        let header = format!("t={t},v1={}", sign(PAYLOAD, SECRET, t));
        assert_eq!(
            verify_webhook_signature(PAYLOAD, &header, SECRET, t + SIGNATURE_TOLERANCE_SECS + 1),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn test_malformed_header_fails() {
        assert_eq!(
            verify_webhook_signature(PAYLOAD, "v1=abc", SECRET, 0),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_webhook_signature(PAYLOAD, "t=123", SECRET, 123),
            Err(SignatureError::MalformedHeader)
        );
        assert_eq!(
            verify_webhook_signature(PAYLOAD, "", SECRET, 0),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn test_webhook_event_parses_stripe_shape() {
        let json = r#"{
            "id": "evt_123",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_a1b2",
                    "amount_total": 700,
                    "metadata": {"plan": "starter", "email": "a@b.com"}
                }
            }
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object.id, "cs_test_a1b2");
        assert_eq!(event.data.object.amount_total, Some(700));
        assert_eq!(event.data.object.metadata["plan"], "starter");
    }

    #[test]
    fn test_webhook_event_tolerates_missing_metadata() {
        let json = r#"{
            "type": "checkout.session.completed",
            "data": {"object": {"id": "cs_1", "amount_total": null}}
        }"#;
        let event: WebhookEvent = serde_json::from_str(json).unwrap();
        assert!(event.data.object.metadata.is_empty());
        assert_eq!(event.data.object.amount_total, None);
    }
}
