use serde_json::Value;

use super::decoder::Utf8Decoder;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// What one `data:` line asks the accumulator to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// Upstream assigned (or echoed) a conversation id.
    Conversation(String),
    /// Incremental text to append.
    Delta(String),
    /// Full answer so far; replaces anything accumulated.
    Answer(String),
    /// Payload that was not JSON; appended verbatim.
    Raw(String),
    /// The `[DONE]` sentinel.
    Done,
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Ignored,
    Done,
    Payload(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let Some(payload) = line.trim().strip_prefix(DATA_PREFIX) else {
        return Line::Ignored;
    };
    match payload.trim() {
        DONE_SENTINEL => Line::Done,
        payload => Line::Payload(payload),
    }
}

fn decode_payload(payload: &str, events: &mut Vec<FrameEvent>) {
    let json = match serde_json::from_str::<Value>(payload) {
        Ok(json) => json,
        Err(_) => {
            events.push(FrameEvent::Raw(payload.to_string()));
            return;
        }
    };

    let text_field = |key: &str| json.get(key).and_then(Value::as_str);

    if let Some(id) = text_field("conversation_id").filter(|id| !id.is_empty()) {
        events.push(FrameEvent::Conversation(id.to_string()));
    }

    if let Some(delta) = text_field("delta").filter(|d| !d.is_empty()) {
        events.push(FrameEvent::Delta(delta.to_string()));
    } else if let Some(answer) = text_field("answer") {
        events.push(FrameEvent::Answer(answer.to_string()));
    }
}

/// Turns an event-stream byte sequence into [`FrameEvent`]s.
///
/// Complete lines are processed as soon as their newline arrives; the
/// unterminated remainder waits for the next chunk. A `[DONE]` line stops
/// processing of the lines that arrived in the same chunk, but later chunks
/// are still parsed.
#[derive(Debug, Default)]
pub struct FrameParser {
    decoder: Utf8Decoder,
    buffer: String,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<FrameEvent> {
        let text = self.decoder.decode(chunk);
        self.buffer.push_str(&text);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let complete: String = self.buffer.drain(..=last_newline).collect();
        parse_lines(complete.split('\n'))
    }

    /// Parses whatever is left once the stream has ended.
    pub fn finish(&mut self) -> Vec<FrameEvent> {
        let tail = self.decoder.finish();
        self.buffer.push_str(&tail);
        let rest = std::mem::take(&mut self.buffer);
        parse_lines(rest.split('\n'))
    }
}

fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<FrameEvent> {
    let mut events = Vec::new();
    for line in lines {
        match classify(line) {
            Line::Ignored => {}
            Line::Done => {
                events.push(FrameEvent::Done);
                break;
            }
            Line::Payload(payload) => decode_payload(payload, &mut events),
        }
    }
    events
}
