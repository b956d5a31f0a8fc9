mod config;
mod errors;
mod models;
mod routes;
mod service;
mod upstream;

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::routes::build_router;
use crate::service::chat_service::ChatService;
use crate::service::rate_limiter::RateLimiter;
use crate::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=debug,tower_http=debug".into()),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let config = Arc::new(GatewayConfig::from_env()?);

    let missing = config.upstream.missing();
    if !missing.is_empty() {
        // Not fatal: /chat answers 500 until these are provided.
        warn!("Upstream API is not configured, missing: {}", missing.join(", "));
    }

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let limiter = RateLimiter::new();
    let upstream = UpstreamClient::new(config.upstream.clone(), config.upstream_timeout)?;
    let chat_service = ChatService::new(config.clone(), limiter.clone(), upstream);

    spawn_rate_limit_sweeper(limiter, config.rate_limit.window);

    // ── Router ────────────────────────────────────────────────────────────────
    let app = build_router(chat_service);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        mode = %config.response_mode,
        timeout_secs = config.upstream_timeout.as_secs(),
        "Listening on http://{addr}/chat"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Expired records are also dropped lazily on access; this only bounds the
/// table for clients that never come back.
fn spawn_rate_limit_sweeper(limiter: RateLimiter, window: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(window.max(std::time::Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            let removed = limiter.prune_expired();
            if removed > 0 {
                debug!(removed, remaining = limiter.tracked_clients(), "Pruned rate-limit records");
            }
        }
    });
}
