use std::time::Duration;

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use thiserror::Error;

/// Reasons a chat request body is rejected before anything leaves the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Request body must be a JSON object")]
    MalformedBody,

    #[error("Query is required")]
    Missing,

    #[error("Query must be a string")]
    WrongType,

    #[error("Query is required and must be a non-empty string")]
    Empty,

    #[error("Query is too long (max {max_length} characters, got {actual_length})")]
    TooLong { max_length: usize, actual_length: usize },

    #[error("Request body is too large")]
    BodyTooLarge,

    #[error("Request body could not be read")]
    UnreadableBody,
}

impl From<BytesRejection> for ValidationError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ValidationError::BodyTooLarge
        } else {
            ValidationError::UnreadableBody
        }
    }
}

/// Top-level gateway error. Every variant is converted into the stable
/// `{ error, details? }` JSON shape at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Client-side ──────────────────────────────────────────────────────────
    #[error("Rate limit exceeded for '{identifier}'")]
    RateLimited { identifier: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Gateway configuration ────────────────────────────────────────────────
    #[error("Missing required environment variables: {}", missing.join(", "))]
    Configuration { missing: Vec<&'static str> },

    // ── Upstream API ─────────────────────────────────────────────────────────
    #[error("Upstream responded with {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    #[error("Upstream did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Upstream transport failed: {0}")]
    Transport(#[source] reqwest::Error),

    // ── System ───────────────────────────────────────────────────────────────
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::RateLimited { .. } | AppError::Validation(_))
    }
}
