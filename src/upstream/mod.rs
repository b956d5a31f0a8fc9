use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use serde_json::Value;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error};

use crate::config::UpstreamSettings;
use crate::errors::AppError;
use crate::models::{ResponseMode, UpstreamEnvelope};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Successful upstream answer, shaped by the requested [`ResponseMode`].
pub enum UpstreamReply {
    /// Live body of an event-stream response, not yet read.
    Stream(ByteStream),
    /// Fully buffered JSON body of a blocking response.
    Json(Value),
}

impl std::fmt::Debug for UpstreamReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamReply::Stream(_) => f.write_str("UpstreamReply::Stream(..)"),
            UpstreamReply::Json(value) => f.debug_tuple("UpstreamReply::Json").field(value).finish(),
        }
    }
}

/// Calls the conversational-AI endpoint on behalf of the gateway.
///
/// The deadline covers everything up to the response head in streaming mode
/// and the whole body in blocking mode. Dropping the returned future (or the
/// returned stream) aborts the in-flight HTTP request.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    settings: UpstreamSettings,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(settings: UpstreamSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;
        Ok(Self { http, settings, timeout })
    }

    pub async fn call(
        &self,
        query: &str,
        conversation_id: Option<&str>,
        mode: ResponseMode,
    ) -> Result<UpstreamReply, AppError> {
        let upstream = self.settings.resolve()?;
        let envelope = UpstreamEnvelope::new(query, conversation_id, mode, upstream.user);
        let deadline = Instant::now() + self.timeout;

        debug!(mode = %mode, has_conversation = conversation_id.is_some(), "Calling upstream API");

        let request = self
            .http
            .post(upstream.url)
            .bearer_auth(upstream.bearer_token)
            .json(&envelope);

        let response = timeout_at(deadline, request.send())
            .await
            .map_err(|_| AppError::Timeout(self.timeout))?
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = match timeout_at(deadline, response.text()).await {
                Ok(Ok(text)) => text,
                _ => String::new(),
            };
            error!(status = status.as_u16(), body = %body, "Upstream API returned an error");
            return Err(AppError::Upstream { status, body });
        }

        match mode {
            ResponseMode::Streaming => Ok(UpstreamReply::Stream(Box::pin(response.bytes_stream()))),
            ResponseMode::Blocking => {
                let value = timeout_at(deadline, response.json::<Value>())
                    .await
                    .map_err(|_| AppError::Timeout(self.timeout))?
                    .map_err(|e| {
                        if e.is_decode() {
                            AppError::Unexpected(format!("Upstream returned invalid JSON: {e}"))
                        } else {
                            self.transport_error(e)
                        }
                    })?;
                Ok(UpstreamReply::Json(value))
            }
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::Timeout(self.timeout)
        } else {
            AppError::Transport(err)
        }
    }
}
