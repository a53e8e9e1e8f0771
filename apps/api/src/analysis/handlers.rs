//! Axum route handlers for the analyze flow.
//!
//! The orchestration order is deliberate: rate limit → resolve principal →
//! provisional authorize → run the expensive analysis → persist the result
//! → commit the debit. A failed analysis exits before anything is debited;
//! a crash between persist and commit costs us a roast, never the user.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::results::{self, Provenance};
use crate::credits::gate::{self, Authorization};
use crate::errors::AppError;
use crate::identity::{resolve, AuthContext};
use crate::models::roast::RoastResult;
use crate::rate_limit::client_ip;
use crate::state::AppState;

/// Requests per minute per client IP for the analyze endpoint.
const ANALYZE_RATE_LIMIT: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub resume: String,
    pub job_description: String,
    /// Self-reported email for guest requests; ignored when a verified
    /// identity is present.
    pub email: Option<String>,
    /// One-time payment session token. When present it is validated
    /// exclusively — credit balances are not consulted.
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<i32>,
    pub funding: &'static str,
}

/// POST /api/v1/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    auth: AuthContext,
    headers: HeaderMap,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let ip = client_ip(&headers);
    state
        .limiter
        .check(&format!("analyze:{ip}"), ANALYZE_RATE_LIMIT)
        .await?;

    if req.resume.trim().is_empty() || req.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "resume and job_description are required".to_string(),
        ));
    }

    let principal = resolve(&auth, req.email.as_deref())?;

    let authorization = gate::authorize(&state.db, &principal, req.session_id.as_deref()).await?;
    if let Authorization::Denied { reason } = authorization {
        return Err(AppError::PaymentRequired(reason));
    }

    // The expensive part. Nothing has been debited yet, so a failure here
    // leaves every ledger untouched and the request retryable.
    let analysis = state
        .analyzer
        .analyze(&req.resume, &req.job_description)
        .await?;

    let result_id = results::short_id();
    let provenance = Provenance {
        is_paid: matches!(authorization, Authorization::Payment { .. }),
        is_free_roast: matches!(authorization, Authorization::FreeGrant),
        email: Some(principal.email()),
        payment_session_id: match &authorization {
            Authorization::Payment { session_id } => Some(session_id.as_str()),
            _ => None,
        },
    };
    results::save_result(&state.db, &result_id, &analysis, provenance).await?;

    let remaining = gate::commit(&state.db, &authorization, &principal, &result_id).await?;

    info!(
        result_id = %result_id,
        funding = authorization.funding(),
        grade = %analysis.grade,
        "analysis persisted"
    );

    Ok(Json(AnalyzeResponse {
        id: result_id,
        remaining,
        funding: authorization.funding(),
    }))
}

/// GET /api/v1/results/:id
pub async fn handle_get_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RoastResult>, AppError> {
    let result = results::get_result(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Result {id} not found")))?;

    Ok(Json(result))
}
