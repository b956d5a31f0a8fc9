//! Converts gateway outcomes into HTTP responses.
//!
//! Failures always leave as `{ error, details? }` JSON. Upstream event
//! streams leave untouched, with headers that keep proxies from buffering.

use axum::Json;
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use futures_util::TryStreamExt;
use serde_json::Value;
use tracing::{error, warn};

use crate::config::Environment;
use crate::errors::{AppError, ValidationError};
use crate::models::ErrorBody;
use crate::upstream::{ByteStream, UpstreamReply};

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

pub fn reply_response(reply: UpstreamReply) -> Response {
    match reply {
        UpstreamReply::Stream(stream) => event_stream_response(stream),
        UpstreamReply::Json(value) => blocking_response(value),
    }
}

/// Passes the upstream bytes through as they arrive.
pub fn event_stream_response(stream: ByteStream) -> Response {
    let body = Body::from_stream(
        stream.inspect_err(|e| warn!(error = %e, "Upstream event stream ended with an error")),
    );

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache, no-transform"),
            // Dropped by hyper on HTTP/2; still sent to HTTP/1.1 proxies.
            (CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        body,
    )
        .into_response()
}

pub fn blocking_response(value: Value) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

/// Maps an [`AppError`] to its client-facing status and message. Raw error
/// detail is attached only for unexpected failures outside production.
pub fn error_response(err: &AppError, environment: Environment) -> Response {
    let (status, message) = status_and_message(err);

    if err.is_client_error() {
        warn!(status = status.as_u16(), error = %err, "Rejected chat request");
    } else {
        error!(status = status.as_u16(), error = %err, "Chat request failed");
    }

    let details = match err {
        AppError::Transport(_) | AppError::Unexpected(_) if environment.exposes_error_details() => {
            Some(err.to_string())
        }
        _ => None,
    };

    (status, Json(ErrorBody { error: message, details })).into_response()
}

fn status_and_message(err: &AppError) -> (StatusCode, String) {
    match err {
        AppError::RateLimited { .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.".to_string(),
        ),
        AppError::Validation(v @ ValidationError::BodyTooLarge) => {
            (StatusCode::PAYLOAD_TOO_LARGE, v.to_string())
        }
        AppError::Validation(v) => (StatusCode::BAD_REQUEST, v.to_string()),
        AppError::Configuration { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error".to_string(),
        ),
        // An upstream 401 is our credential problem, not the browser's.
        AppError::Upstream { status, .. } if *status == StatusCode::UNAUTHORIZED => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication failed".to_string(),
        ),
        AppError::Upstream { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests to AI service. Please try again later.".to_string(),
        ),
        AppError::Upstream { status, .. } => (*status, format!("API error: {}", status.as_u16())),
        AppError::Timeout(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "Request timeout. Please try again.".to_string(),
        ),
        AppError::Transport(_) | AppError::Unexpected(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to process request".to_string(),
        ),
    }
}
