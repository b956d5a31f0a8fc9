use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the upstream API is asked to deliver its answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Streaming,
    Blocking,
}

impl ResponseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseMode::Streaming => "streaming",
            ResponseMode::Blocking => "blocking",
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "streaming" => Ok(ResponseMode::Streaming),
            "blocking" => Ok(ResponseMode::Blocking),
            other => Err(format!("Unknown response mode: {other}")),
        }
    }
}

/// A validated chat submission. `query` is already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub query: String,
    pub conversation_id: Option<String>,
}

/// Request body sent to the upstream API.
#[derive(Debug, Serialize)]
pub struct UpstreamEnvelope<'a> {
    pub query: &'a str,
    pub inputs: Map<String, Value>,
    pub response_mode: ResponseMode,
    pub conversation_id: &'a str,
    pub user: &'a str,
    pub files: Vec<Value>,
}

impl<'a> UpstreamEnvelope<'a> {
    pub fn new(
        query: &'a str,
        conversation_id: Option<&'a str>,
        response_mode: ResponseMode,
        user: &'a str,
    ) -> Self {
        Self {
            query,
            inputs: Map::new(),
            response_mode,
            conversation_id: conversation_id.unwrap_or_default(),
            user,
            files: Vec::new(),
        }
    }
}

/// Error body returned to the browser for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_uses_empty_conversation_id_when_absent() {
        let envelope = UpstreamEnvelope::new("hello", None, ResponseMode::Streaming, "bot@example.com");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "query": "hello",
                "inputs": {},
                "response_mode": "streaming",
                "conversation_id": "",
                "user": "bot@example.com",
                "files": []
            })
        );
    }

    #[test]
    fn envelope_carries_conversation_id_and_blocking_mode() {
        let envelope =
            UpstreamEnvelope::new("hi", Some("conv-1"), ResponseMode::Blocking, "svc");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["conversation_id"], "conv-1");
        assert_eq!(value["response_mode"], "blocking");
    }

    #[test]
    fn response_mode_parses_case_insensitively() {
        assert_eq!("Blocking".parse::<ResponseMode>(), Ok(ResponseMode::Blocking));
        assert_eq!(" streaming ".parse::<ResponseMode>(), Ok(ResponseMode::Streaming));
        assert!("sse".parse::<ResponseMode>().is_err());
    }

    #[test]
    fn error_body_omits_absent_details() {
        let body = ErrorBody { error: "nope".into(), details: None };
        assert_eq!(serde_json::to_string(&body).unwrap(), r#"{"error":"nope"}"#);
    }
}
