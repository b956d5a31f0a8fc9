use serde_json::Value;

use crate::errors::ValidationError;
use crate::models::ChatRequest;

pub const MAX_QUERY_CHARS: usize = 2000;

/// Parses and validates a raw `POST /chat` body.
pub fn parse_chat_request(body: &[u8]) -> Result<ChatRequest, ValidationError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::MalformedBody)?;
    validate(&value)
}

/// Checks `query` (present, string, non-blank, at most [`MAX_QUERY_CHARS`]
/// once trimmed) and picks up an optional non-empty string `conversation_id`.
pub fn validate(body: &Value) -> Result<ChatRequest, ValidationError> {
    let object = body.as_object().ok_or(ValidationError::MalformedBody)?;

    let query = match object.get("query") {
        None | Some(Value::Null) => return Err(ValidationError::Missing),
        Some(Value::String(s)) => s.trim(),
        Some(_) => return Err(ValidationError::WrongType),
    };

    if query.is_empty() {
        return Err(ValidationError::Empty);
    }

    let length = query.chars().count();
    if length > MAX_QUERY_CHARS {
        return Err(ValidationError::TooLong {
            max_length: MAX_QUERY_CHARS,
            actual_length: length,
        });
    }

    let conversation_id = object
        .get("conversation_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    Ok(ChatRequest {
        query: query.to_string(),
        conversation_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_and_trims_query() {
        let request = validate(&json!({ "query": "  hello  " })).unwrap();
        assert_eq!(request.query, "hello");
        assert_eq!(request.conversation_id, None);
    }

    #[test]
    fn keeps_conversation_id_when_present() {
        let request = validate(&json!({ "query": "q", "conversation_id": "abc" })).unwrap();
        assert_eq!(request.conversation_id.as_deref(), Some("abc"));
    }

    #[test]
    fn ignores_blank_or_non_string_conversation_id() {
        let blank = validate(&json!({ "query": "q", "conversation_id": "" })).unwrap();
        assert_eq!(blank.conversation_id, None);
        let number = validate(&json!({ "query": "q", "conversation_id": 7 })).unwrap();
        assert_eq!(number.conversation_id, None);
    }

    #[test]
    fn reports_each_constraint() {
        assert_eq!(validate(&json!({})), Err(ValidationError::Missing));
        assert_eq!(validate(&json!({ "query": null })), Err(ValidationError::Missing));
        assert_eq!(validate(&json!({ "query": 42 })), Err(ValidationError::WrongType));
        assert_eq!(validate(&json!({ "query": "   \n" })), Err(ValidationError::Empty));
        assert_eq!(validate(&json!(["query"])), Err(ValidationError::MalformedBody));
    }

    #[test]
    fn length_boundary_is_counted_in_characters_after_trimming() {
        let at_limit = "é".repeat(MAX_QUERY_CHARS);
        assert!(validate(&json!({ "query": format!("  {at_limit}  ") })).is_ok());

        let over = "a".repeat(MAX_QUERY_CHARS + 1);
        assert_eq!(
            validate(&json!({ "query": over })),
            Err(ValidationError::TooLong {
                max_length: MAX_QUERY_CHARS,
                actual_length: MAX_QUERY_CHARS + 1,
            })
        );
    }

    #[test]
    fn rejects_unparseable_body() {
        assert_eq!(parse_chat_request(b"{not json"), Err(ValidationError::MalformedBody));
        assert!(parse_chat_request(br#"{"query":"ok"}"#).is_ok());
    }
}
