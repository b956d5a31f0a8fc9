use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::response::Response;
use chrono::{SecondsFormat, Utc};
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use crate::errors::ValidationError;
use crate::models::HealthResponse;
use crate::routes::translator;
use crate::service::chat_service::ChatService;
use crate::service::rate_limiter::UNKNOWN_CLIENT;

/// POST `/chat`: forwards a query upstream, answering with an event stream
/// or a JSON body depending on the configured response mode.
pub async fn chat_handler(
    State(svc): State<ChatService>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let identifier = client_identifier(&headers);
    let span = info_span!("chat", request_id = %Uuid::new_v4(), client = %identifier);

    async move {
        let body = body.map_err(|rejection| {
            debug!(reason = %rejection.body_text(), "Request body rejected");
            ValidationError::from(rejection)
        });
        match svc.chat(&identifier, body).await {
            Ok(reply) => translator::reply_response(reply),
            Err(err) => translator::error_response(&err, svc.config().environment),
        }
    }
    .instrument(span)
    .await
}

/// GET `/chat`: liveness probe.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Rate-limit key for a request: the first `x-forwarded-for` hop, then
/// `x-real-ip`, then the shared [`UNKNOWN_CLIENT`] bucket.
pub fn client_identifier(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}
