pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::billing::handlers as billing;
use crate::credits::handlers as credits;
use crate::resume;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Analysis
        .route("/api/v1/analyze", post(analysis::handle_analyze))
        .route("/api/v1/results/:id", get(analysis::handle_get_result))
        .route("/api/v1/resume/parse", post(resume::handle_parse_resume))
        // Credits / free tier
        .route("/api/v1/free/check", post(credits::handle_free_check))
        .route("/api/v1/free/mark", post(credits::handle_free_mark))
        .route("/api/v1/user/check", post(credits::handle_user_check))
        // Billing
        .route("/api/v1/checkout", post(billing::handle_checkout))
        .route("/api/v1/webhook/stripe", post(billing::handle_stripe_webhook))
        .with_state(state)
}
