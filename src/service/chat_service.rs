use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::errors::{AppError, ValidationError};
use crate::service::rate_limiter::RateLimiter;
use crate::service::validator::parse_chat_request;
use crate::upstream::{UpstreamClient, UpstreamReply};

/// Per-request pipeline: rate limit, validate, forward.
#[derive(Clone)]
pub struct ChatService {
    config: Arc<GatewayConfig>,
    limiter: RateLimiter,
    upstream: UpstreamClient,
}

impl ChatService {
    pub fn new(config: Arc<GatewayConfig>, limiter: RateLimiter, upstream: UpstreamClient) -> Self {
        Self { config, limiter, upstream }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// `body` is the raw request body, or the reason it could not be read.
    /// Unreadable bodies still count against the client's rate limit.
    pub async fn chat(
        &self,
        identifier: &str,
        body: Result<Bytes, ValidationError>,
    ) -> Result<UpstreamReply, AppError> {
        // ── Rate limiting ─────────────────────────────────────────────────────
        let policy = self.config.rate_limit;
        if !self.limiter.allow(identifier, policy.max_requests, policy.window) {
            warn!(client = identifier, "Rate limit exceeded");
            return Err(AppError::RateLimited {
                identifier: identifier.to_string(),
            });
        }

        // ── Validation ────────────────────────────────────────────────────────
        let request = parse_chat_request(&body?)?;

        // ── Forward to the upstream API ───────────────────────────────────────
        let mode = self.config.response_mode;
        info!(
            mode = %mode,
            query_chars = request.query.chars().count(),
            conversation_id = request.conversation_id.as_deref().unwrap_or(""),
            "Forwarding chat request"
        );
        self.upstream
            .call(&request.query, request.conversation_id.as_deref(), mode)
            .await
    }
}
