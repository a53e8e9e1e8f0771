use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::credits::gate::DenialReason;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthenticated")]
    Unauthenticated,

    /// Entitlement denial. Surfaced as a paywall prompt (402), never a 5xx.
    #[error("Payment required: {0}")]
    PaymentRequired(DenialReason),

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Analysis error: {0}")]
    Llm(String),

    #[error("Payment provider error: {0}")]
    Payment(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "Sign in to continue".to_string(),
            ),
            AppError::PaymentRequired(reason) => {
                // Denials carry a machine-readable reason so the client can
                // route to the right paywall screen.
                let body = Json(json!({
                    "error": {
                        "code": "PAYMENT_REQUIRED",
                        "message": reason.message(),
                    },
                    "needs_payment": true,
                    "reason": reason.as_str(),
                }));
                return (StatusCode::PAYMENT_REQUIRED, body).into_response();
            }
            AppError::RateLimited { retry_after } => {
                let body = Json(json!({
                    "error": {
                        "code": "RATE_LIMITED",
                        "message": "Too many requests. Please wait a minute before trying again.",
                    },
                    "retry_after": retry_after,
                }));
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, retry_after.to_string())],
                    body,
                )
                    .into_response();
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "ANALYSIS_FAILED",
                    "Failed to analyze. Please try again.".to_string(),
                )
            }
            AppError::Payment(msg) => {
                tracing::error!("Payment provider error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "PAYMENT_PROVIDER_ERROR",
                    "The payment provider is unavailable. Please try again.".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
