use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credits::{entitlements, free_tier};
use crate::errors::AppError;
use crate::identity::{resolve, AuthContext};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct FreeCheckResponse {
    pub already_used: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_id: Option<String>,
}

/// POST /api/v1/free/check
///
/// Free-tier status for a self-reported email. No proof of ownership is
/// required; the response only reveals whether the grant was spent.
pub async fn handle_free_check(
    State(state): State<AppState>,
    Json(req): Json<EmailRequest>,
) -> Result<Json<FreeCheckResponse>, AppError> {
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }

    let status = free_tier::check_email(&state.db, &req.email).await?;
    Ok(Json(FreeCheckResponse {
        already_used: status.exists,
        used_at: status.used_at,
        result_id: status.result_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FreeMarkRequest {
    pub email: String,
    pub result_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FreeMarkResponse {
    pub success: bool,
    pub already_used: bool,
}

/// POST /api/v1/free/mark
///
/// Records the one-shot grant for an email. Safe to call repeatedly.
pub async fn handle_free_mark(
    State(state): State<AppState>,
    Json(req): Json<FreeMarkRequest>,
) -> Result<Json<FreeMarkResponse>, AppError> {
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }

    let outcome = free_tier::mark_used(&state.db, &req.email, req.result_id.as_deref()).await?;
    Ok(Json(FreeMarkResponse {
        success: true,
        already_used: outcome.already_used,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UserCheckRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserCheckResponse {
    pub email: String,
    pub roasts_remaining: i32,
    pub total_roasts: i32,
    pub plan: String,
}

/// POST /api/v1/user/check
///
/// Balance/plan echo for the paywall UI. Uses the verified identity when
/// present, otherwise the self-reported email; first sight creates the
/// record with the free allotment.
pub async fn handle_user_check(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UserCheckRequest>,
) -> Result<Json<UserCheckResponse>, AppError> {
    let principal = resolve(&auth, req.email.as_deref())?;

    let account_id = match &principal {
        crate::identity::Principal::Account { id, .. } => Some(id.as_str()),
        crate::identity::Principal::Guest { .. } => None,
    };
    let account = entitlements::get_or_create(&state.db, principal.email(), account_id).await?;

    Ok(Json(UserCheckResponse {
        email: account.email,
        roasts_remaining: account.roasts_remaining,
        total_roasts: account.total_roasts,
        plan: account.plan,
    }))
}
