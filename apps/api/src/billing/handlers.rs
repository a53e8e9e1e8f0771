//! Checkout and webhook route handlers.

use axum::{extract::State, http::HeaderMap, Json};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::billing::stripe::{verify_webhook_signature, CheckoutKind, WebhookEvent};
use crate::credits::{entitlements, payments};
use crate::errors::AppError;
use crate::identity::{resolve, AuthContext};
use crate::models::account::Plan;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct CheckoutRequest {
    /// Absent for a one-off $7 roast; present for a credit-pack purchase.
    pub plan: Option<Plan>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}

/// POST /api/v1/checkout
///
/// Creates a payment-provider checkout session and returns its redirect
/// URL. Pack purchases carry the purchaser's normalized email in session
/// metadata so the webhook can credit the right account.
pub async fn handle_checkout(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let kind = match req.plan {
        Some(plan) => {
            let principal = resolve(&auth, req.email.as_deref())?;
            CheckoutKind::Pack {
                plan: plan.as_str().to_string(),
                email: principal.email().to_string(),
            }
        }
        None => CheckoutKind::SingleRoast,
    };

    let session = state
        .stripe
        .create_checkout_session(&kind, &state.config.public_url)
        .await?;

    let url = session
        .url
        .ok_or_else(|| AppError::Payment("checkout session has no redirect URL".to_string()))?;

    Ok(Json(CheckoutResponse { url }))
}

/// POST /api/v1/webhook/stripe
///
/// The payment provider's confirmation entry point. Signature-verified
/// against the raw body; `record` absorbs redeliveries, and only a fresh
/// record for a pack session triggers the one-shot credit top-up.
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Validation("missing Stripe-Signature header".to_string()))?;

    verify_webhook_signature(
        &body,
        signature,
        &state.config.stripe_webhook_secret,
        Utc::now().timestamp(),
    )
    .map_err(|e| AppError::Validation(format!("webhook signature rejected: {e}")))?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("unreadable webhook payload: {e}")))?;

    if event.event_type != "checkout.session.completed" {
        return Ok(Json(json!({ "received": true })));
    }

    let session = &event.data.object;
    let fresh = payments::record(&state.db, &session.id, session.amount_total).await?;
    if !fresh {
        info!(session_id = %session.id, "webhook redelivered, session already recorded");
        return Ok(Json(json!({ "received": true })));
    }
    info!(session_id = %session.id, "payment recorded");

    // Pack purchases name their buyer; the freshness check above makes
    // this top-up fire at most once per session.
    if let (Some(plan), Some(email)) = (
        session.metadata.get("plan"),
        session.metadata.get("email"),
    ) {
        match Plan::parse(plan) {
            Some(plan) => {
                entitlements::get_or_create(&state.db, email, None).await?;
                let account = entitlements::top_up(
                    &state.db,
                    email,
                    plan.roast_count(),
                    Some(plan.as_str()),
                )
                .await?;
                info!(
                    email = %account.email,
                    plan = %account.plan,
                    remaining = account.roasts_remaining,
                    "credit pack applied"
                );
            }
            None => {
                warn!(session_id = %session.id, plan = %plan, "unknown plan in session metadata")
            }
        }
    }

    Ok(Json(json!({ "received": true })))
}
