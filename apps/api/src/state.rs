use std::sync::Arc;

use sqlx::PgPool;

use crate::analysis::engine::RoastAnalyzer;
use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::rate_limit::RateLimiter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    /// Pluggable analysis backend. Production: `LlmRoastAnalyzer`.
    pub analyzer: Arc<dyn RoastAnalyzer>,
    pub stripe: StripeClient,
    pub limiter: Arc<RateLimiter>,
}
