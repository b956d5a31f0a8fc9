//! Blocking-mode fallback: a single JSON answer revealed word by word.

use std::future::Future;

use serde_json::Value;

use super::accumulator::TurnAccumulator;
use super::frame::FrameEvent;
use super::{DisplaySink, RelayError, dispatch};

pub const APOLOGY: &str = "Sorry, the answer could not be processed.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingAnswer {
    pub answer: String,
    pub conversation_id: Option<String>,
}

/// Reads `answer` and `conversation_id`, unwrapping a `{ success, data }`
/// envelope when both members are truthy.
pub fn extract_answer(body: &Value) -> BlockingAnswer {
    let data = match (body.get("success"), body.get("data")) {
        (Some(success), Some(data)) if is_truthy(success) && is_truthy(data) => data,
        _ => body,
    };
    let text = |key: &str| {
        data.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    BlockingAnswer {
        answer: text("answer").unwrap_or_else(|| APOLOGY.to_string()),
        conversation_id: text("conversation_id"),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Growing prefixes of `text`, one per space-separated word, ending with
/// `text` itself.
pub fn word_prefixes(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices(' ')
        .map(|(i, _)| &text[..i])
        .filter(|prefix| !prefix.is_empty())
        .chain(std::iter::once(text))
}

/// Publishes the answer progressively, awaiting `next_frame` before each
/// word. An error from `next_frame` ends the reveal as a failed turn.
pub async fn reveal<K, F, Fut>(
    body: &Value,
    acc: &mut TurnAccumulator,
    sink: &mut K,
    mut next_frame: F,
) -> Result<(), RelayError>
where
    K: DisplaySink,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), RelayError>>,
{
    let BlockingAnswer {
        answer,
        conversation_id,
    } = extract_answer(body);

    if let Some(id) = conversation_id {
        dispatch(acc, sink, FrameEvent::Conversation(id));
    }

    for prefix in word_prefixes(&answer) {
        if let Err(err) = next_frame().await {
            sink.publish(acc.fail(&err));
            return Err(err);
        }
        dispatch(acc, sink, FrameEvent::Answer(prefix.to_string()));
    }

    sink.publish(acc.finish());
    Ok(())
}
