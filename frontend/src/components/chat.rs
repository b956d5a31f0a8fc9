use leptos::ev;
use leptos::prelude::*;

use crate::models::Message;
use crate::state::AppState;

/// Main chat area with message history and input.
#[component]
pub fn ChatArea() -> impl IntoView {
    let state = expect_context::<AppState>();

    view! {
        <main class="chat-area">
            <div class="messages-container">
                {move || {
                    let msgs = state.messages.get();
                    if msgs.is_empty() {
                        view! {
                            <div class="empty-state">"Hello! How can I help you today?"</div>
                        }
                            .into_any()
                    } else {
                        msgs.into_iter()
                            .map(|message| view! { <MessageBubble message=message /> })
                            .collect_view()
                            .into_any()
                    }
                }}
            </div>

            <ChatInput />
        </main>
    }
}

/// A single chat message bubble.
#[component]
fn MessageBubble(message: Message) -> impl IntoView {
    let css_class = format!("message {}", message.role.as_str());
    let body_class = if message.is_streaming { "streaming-cursor" } else { "" };

    view! {
        <div class=css_class>
            <div class="role-label">{message.role.as_str()}</div>
            <div class=body_class>{message.content}</div>
        </div>
    }
}

/// Chat input. Sending while a reply is still streaming replaces that turn.
#[component]
fn ChatInput() -> impl IntoView {
    let state = expect_context::<AppState>();
    let (input, set_input) = signal(String::new());

    let send = move || {
        let text = input.get_untracked();
        if text.trim().is_empty() {
            return;
        }
        set_input.set(String::new());
        state.send_message(text);
    };

    let on_keydown = move |ev: ev::KeyboardEvent| {
        if ev.key() == "Enter" && !ev.shift_key() {
            ev.prevent_default();
            send();
        }
    };

    view! {
        <div class="input-area">
            <div class="input-row">
                <textarea
                    rows="1"
                    placeholder="Type a message… (Enter to send, Shift+Enter for newline)"
                    prop:value=input
                    on:input=move |ev| {
                        set_input.set(event_target_value(&ev));
                    }
                    on:keydown=on_keydown
                />
                <button
                    class="send-btn"
                    on:click=move |_| send()
                    disabled=move || input.get().trim().is_empty()
                >
                    {move || if state.is_loading.get() { "Sending…" } else { "Send" }}
                </button>
            </div>
        </div>
    }
}
