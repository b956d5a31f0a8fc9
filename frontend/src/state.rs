use std::cell::RefCell;

use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::AbortSignal;

use crate::api::{self, AbortTurn, ChatReply};
use crate::models::{ChatRequest, Message};
use crate::relay::reveal::reveal;
use crate::relay::{
    DisplaySink, RelayError, TurnAccumulator, TurnSlot, Update as RelayUpdate, relay_stream,
};

/// Opening line of every assistant bubble while the answer is on its way.
pub const GREETING: &str = "📝 Your question has been received. Preparing a reply...";

thread_local! {
    static TURNS: RefCell<TurnSlot<AbortTurn>> = RefCell::new(TurnSlot::default());
}

/// Shared application state, provided via Leptos context.
#[derive(Clone, Copy)]
pub struct AppState {
    pub messages: ReadSignal<Vec<Message>>,
    pub is_loading: ReadSignal<bool>,
    pub conversation_id: ReadSignal<Option<String>>,

    set_messages: WriteSignal<Vec<Message>>,
    set_is_loading: WriteSignal<bool>,
    set_conversation_id: WriteSignal<Option<String>>,
}

impl AppState {
    /// Create a new `AppState` and provide it in the current Leptos context.
    pub fn provide() -> Self {
        let (messages, set_messages) = signal(Vec::<Message>::new());
        let (is_loading, set_is_loading) = signal(false);
        let (conversation_id, set_conversation_id) = signal(None::<String>);

        let state = Self {
            messages,
            is_loading,
            conversation_id,
            set_messages,
            set_is_loading,
            set_conversation_id,
        };

        provide_context(state);
        state
    }

    /// Starts a new turn, canceling the one still in flight, if any.
    pub fn send_message(&self, text: String) {
        let query = text.trim().to_string();
        if query.is_empty() {
            return;
        }

        let handle = match AbortTurn::new() {
            Ok(handle) => handle,
            Err(e) => {
                log::error!("Cannot create abort controller: {e}");
                return;
            }
        };
        let signal = handle.signal();
        let turn = TURNS.with_borrow_mut(|slot| slot.begin(handle));

        let assistant = Message::pending_assistant(GREETING.to_string());
        let assistant_id = assistant.id.clone();
        self.set_messages.update(|msgs| {
            msgs.push(Message::user(query.clone()));
            msgs.push(assistant);
        });
        self.set_is_loading.set(true);

        let known = self.conversation_id.get_untracked();
        let request = ChatRequest {
            query,
            conversation_id: known.clone(),
        };
        let state = *self;

        spawn_local(async move {
            let mut sink = MessageSink {
                state,
                message_id: assistant_id,
            };
            let mut acc = TurnAccumulator::new(format!("{GREETING}\n\n"), known);

            match run_turn(&request, &signal, &mut acc, &mut sink).await {
                Ok(()) => log::debug!("Turn completed"),
                Err(RelayError::Aborted) => log::info!("Turn canceled"),
                Err(e) => log::warn!("Turn failed: {e}"),
            }

            if TURNS.with_borrow_mut(|slot| slot.finish(turn)) {
                state.set_is_loading.set(false);
            }
        });
    }
}

async fn run_turn(
    request: &ChatRequest,
    signal: &AbortSignal,
    acc: &mut TurnAccumulator,
    sink: &mut MessageSink,
) -> Result<(), RelayError> {
    let reply = match api::send_chat(request, signal).await {
        Ok(reply) => reply,
        Err(err) => {
            sink.publish(acc.fail(&err));
            return Err(err);
        }
    };

    match reply {
        ChatReply::Stream(body) => relay_stream(api::byte_chunks(body), acc, sink).await,
        ChatReply::Blocking(json) => {
            let signal = signal.clone();
            reveal(&json, acc, sink, move || api::next_animation_frame(signal.clone())).await
        }
    }
}

/// Writes relay output into one assistant message.
struct MessageSink {
    state: AppState,
    message_id: String,
}

impl DisplaySink for MessageSink {
    fn publish(&mut self, update: RelayUpdate) {
        let id = &self.message_id;
        self.state.set_messages.update(|msgs| {
            if let Some(msg) = msgs.iter_mut().find(|m| &m.id == id) {
                msg.content = update.content;
                msg.is_streaming = update.is_streaming;
            }
        });
    }

    fn adopt_conversation(&mut self, conversation_id: &str) {
        self.state.set_conversation_id.update(|current| {
            if current.is_none() {
                *current = Some(conversation_id.to_string());
            }
        });
    }
}
