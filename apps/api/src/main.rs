mod analysis;
mod billing;
mod config;
mod credits;
mod db;
mod errors;
mod identity;
mod llm_client;
mod models;
mod rate_limit;
mod resume;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::engine::LlmRoastAnalyzer;
use crate::billing::stripe::StripeClient;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::rate_limit::RateLimiter;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Crate name is hyphenated; tracing targets are not.
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Roast API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (and apply migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis-backed rate limiting; in-process fallback when unset
    let redis = match &config.redis_url {
        Some(url) => {
            let client = redis::Client::open(url.clone())?;
            info!("Redis client initialized");
            Some(client)
        }
        None => {
            info!("REDIS_URL not set, using in-process rate limiting");
            None
        }
    };
    let limiter = Arc::new(RateLimiter::new(redis));

    // Initialize LLM client and the analyzer seam
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);
    let analyzer = Arc::new(LlmRoastAnalyzer::new(llm));

    // Initialize payment provider client
    let stripe = StripeClient::new(config.stripe_secret_key.clone());
    info!("Stripe client initialized");

    // Build app state
    let state = AppState {
        db,
        config: config.clone(),
        analyzer,
        stripe,
        limiter,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
