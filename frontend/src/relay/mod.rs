//! Browser-independent core of the chat relay: event-stream parsing, answer
//! accumulation, blocking-mode reveal and single-turn cancellation.

pub mod accumulator;
pub mod decoder;
pub mod frame;
pub mod reveal;

use std::fmt;
use std::pin::pin;

use futures::{Stream, StreamExt};

use accumulator::Effect;
pub use accumulator::{TurnAccumulator, Update};
use frame::{FrameEvent, FrameParser};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The turn was canceled, usually because a newer message was sent.
    Aborted,
    /// The gateway answered with a non-2xx status.
    Http { status: u16, message: Option<String> },
    Network(String),
    Decode(String),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::Aborted => f.write_str("request aborted"),
            RelayError::Http { status, message: Some(message) } => {
                write!(f, "gateway error {status}: {message}")
            }
            RelayError::Http { status, message: None } => write!(f, "gateway error {status}"),
            RelayError::Network(e) => write!(f, "network error: {e}"),
            RelayError::Decode(e) => write!(f, "decode error: {e}"),
        }
    }
}

impl std::error::Error for RelayError {}

/// Whether a gateway reply should be read as an event stream rather than
/// one JSON body. Media-type parameters such as `charset` are ignored.
pub fn is_event_stream(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("text/event-stream"))
}

/// Where relay output ends up (the assistant message in the UI).
pub trait DisplaySink {
    fn publish(&mut self, update: Update);
    fn adopt_conversation(&mut self, conversation_id: &str);
}

pub(crate) fn dispatch<K: DisplaySink>(acc: &mut TurnAccumulator, sink: &mut K, event: FrameEvent) {
    match acc.apply(event) {
        Some(Effect::Publish(update)) => sink.publish(update),
        Some(Effect::AdoptConversation(id)) => sink.adopt_conversation(&id),
        None => {}
    }
}

/// Relays an event-stream body to `sink`, in arrival order, until the chunk
/// stream ends. Always leaves the sink with a non-streaming update, including
/// when a chunk read fails or the turn is aborted.
pub async fn relay_stream<S, K>(
    chunks: S,
    acc: &mut TurnAccumulator,
    sink: &mut K,
) -> Result<(), RelayError>
where
    S: Stream<Item = Result<Vec<u8>, RelayError>>,
    K: DisplaySink,
{
    let mut chunks = pin!(chunks);
    let mut parser = FrameParser::new();

    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(bytes) => {
                for event in parser.push(&bytes) {
                    dispatch(acc, sink, event);
                }
            }
            Err(err) => {
                sink.publish(acc.fail(&err));
                return Err(err);
            }
        }
    }

    for event in parser.finish() {
        dispatch(acc, sink, event);
    }
    sink.publish(acc.finish());
    Ok(())
}

/// Something that can abort an in-flight turn.
pub trait Cancel {
    fn cancel(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnId(u64);

/// Holds the cancel handle of the one turn allowed to be in flight.
pub struct TurnSlot<C> {
    active: Option<(TurnId, C)>,
    issued: u64,
}

impl<C> Default for TurnSlot<C> {
    fn default() -> Self {
        Self {
            active: None,
            issued: 0,
        }
    }
}

impl<C: Cancel> TurnSlot<C> {
    /// Cancels the current turn, if any, and makes `handle` the active one.
    pub fn begin(&mut self, handle: C) -> TurnId {
        if let Some((_, previous)) = self.active.take() {
            previous.cancel();
        }
        self.issued += 1;
        let id = TurnId(self.issued);
        self.active = Some((id, handle));
        id
    }

    /// Releases `id`. Returns `false` when a newer turn has already replaced it.
    pub fn finish(&mut self, id: TurnId) -> bool {
        match &self.active {
            Some((active, _)) if *active == id => {
                self.active = None;
                true
            }
            _ => false,
        }
    }
}
