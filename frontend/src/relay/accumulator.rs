use super::RelayError;
use super::frame::FrameEvent;

pub const CANCELED_NOTE: &str = "Previous request canceled.";
pub const CONNECTION_ERROR_NOTE: &str = "Connection error, please try again.";

/// Content to show in the assistant bubble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub content: String,
    pub is_streaming: bool,
}

/// Side effect requested by a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Publish(Update),
    AdoptConversation(String),
}

/// Running state of one assistant turn.
///
/// While streaming, published content is `greeting_prefix + answer`; the
/// terminal update carries the bare answer. A conversation id is adopted only
/// if none was known when the turn started or earlier in the turn.
#[derive(Debug, Clone)]
pub struct TurnAccumulator {
    greeting_prefix: String,
    answer: String,
    displayed: String,
    conversation_id: Option<String>,
}

impl TurnAccumulator {
    pub fn new(greeting_prefix: impl Into<String>, known_conversation: Option<String>) -> Self {
        let greeting_prefix = greeting_prefix.into();
        Self {
            displayed: greeting_prefix.clone(),
            greeting_prefix,
            answer: String::new(),
            conversation_id: known_conversation,
        }
    }

    pub fn apply(&mut self, event: FrameEvent) -> Option<Effect> {
        match event {
            FrameEvent::Conversation(id) => {
                if self.conversation_id.is_some() {
                    return None;
                }
                self.conversation_id = Some(id.clone());
                Some(Effect::AdoptConversation(id))
            }
            FrameEvent::Delta(text) | FrameEvent::Raw(text) => {
                self.answer.push_str(&text);
                Some(Effect::Publish(self.streaming_update()))
            }
            FrameEvent::Answer(text) => {
                self.answer = text;
                Some(Effect::Publish(self.streaming_update()))
            }
            FrameEvent::Done => None,
        }
    }

    /// Terminal update once the stream has ended normally.
    pub fn finish(&self) -> Update {
        let content = if self.answer.is_empty() {
            self.displayed.clone()
        } else {
            self.answer.clone()
        };
        Update { content, is_streaming: false }
    }

    /// Terminal update for a turn that was canceled or failed. Text received
    /// before the failure stays visible above the note.
    pub fn fail(&self, err: &RelayError) -> Update {
        let note = match err {
            RelayError::Aborted => CANCELED_NOTE,
            RelayError::Http { message: Some(message), .. } => message.as_str(),
            _ => CONNECTION_ERROR_NOTE,
        };
        let content = if self.answer.is_empty() {
            format!("{}{note}", self.greeting_prefix)
        } else {
            format!("{}\n\n{note}", self.answer)
        };
        Update { content, is_streaming: false }
    }

    fn streaming_update(&mut self) -> Update {
        self.displayed = format!("{}{}", self.greeting_prefix, self.answer);
        Update {
            content: self.displayed.clone(),
            is_streaming: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn published(effect: Option<Effect>) -> Update {
        match effect {
            Some(Effect::Publish(update)) => update,
            other => panic!("expected publish, got {other:?}"),
        }
    }

    #[test]
    fn deltas_append_behind_greeting() {
        let mut acc = TurnAccumulator::new("Hi!\n\n", None);
        published(acc.apply(FrameEvent::Delta("A".into())));
        let update = published(acc.apply(FrameEvent::Delta("B".into())));

        assert_eq!(update, Update { content: "Hi!\n\nAB".into(), is_streaming: true });
        assert_eq!(acc.finish(), Update { content: "AB".into(), is_streaming: false });
    }

    #[test]
    fn answer_replaces_accumulated_text() {
        let mut acc = TurnAccumulator::new("", None);
        acc.apply(FrameEvent::Delta("partial ".into()));
        let update = published(acc.apply(FrameEvent::Answer("full text".into())));

        assert_eq!(update.content, "full text");
        assert_eq!(acc.finish().content, "full text");
    }

    #[test]
    fn raw_payload_is_appended() {
        let mut acc = TurnAccumulator::new("", None);
        acc.apply(FrameEvent::Delta("A".into()));
        acc.apply(FrameEvent::Raw("{broken".into()));
        assert_eq!(acc.finish().content, "A{broken");
    }

    #[test]
    fn first_conversation_id_wins() {
        let mut acc = TurnAccumulator::new("", None);
        assert_eq!(
            acc.apply(FrameEvent::Conversation("first".into())),
            Some(Effect::AdoptConversation("first".into()))
        );
        assert_eq!(acc.apply(FrameEvent::Conversation("second".into())), None);
    }

    #[test]
    fn known_conversation_is_never_replaced() {
        let mut acc = TurnAccumulator::new("", Some("session".into()));
        assert_eq!(acc.apply(FrameEvent::Conversation("other".into())), None);
    }

    #[test]
    fn finish_without_answer_keeps_current_content() {
        let acc = TurnAccumulator::new("Greeting\n\n", None);
        assert_eq!(acc.finish(), Update { content: "Greeting\n\n".into(), is_streaming: false });
    }

    #[test]
    fn failures_produce_terminal_notes() {
        let acc = TurnAccumulator::new("Greeting\n\n", None);

        let canceled = acc.fail(&RelayError::Aborted);
        assert_eq!(canceled.content, format!("Greeting\n\n{CANCELED_NOTE}"));
        assert!(!canceled.is_streaming);

        let network = acc.fail(&RelayError::Network("reset".into()));
        assert_eq!(network.content, format!("Greeting\n\n{CONNECTION_ERROR_NOTE}"));

        let http = acc.fail(&RelayError::Http { status: 429, message: Some("Slow down".into()) });
        assert_eq!(http.content, "Greeting\n\nSlow down");
    }

    #[test]
    fn cancellation_keeps_partial_answer_and_marks_it() {
        let mut acc = TurnAccumulator::new("Greeting\n\n", None);
        acc.apply(FrameEvent::Delta("half an ans".into()));

        let update = acc.fail(&RelayError::Aborted);
        assert_eq!(update.content, format!("half an ans\n\n{CANCELED_NOTE}"));
        assert!(!update.is_streaming);
    }
}
