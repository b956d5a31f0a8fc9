mod api;
mod components;
mod models;
mod relay;
mod state;

use gloo_timers::future::TimeoutFuture;
use leptos::mount::mount_to_body;
use leptos::prelude::*;
use leptos::task::spawn_local;

use components::chat::ChatArea;
use state::AppState;

/// Delay before a `?message=` query is submitted on load.
const AUTO_SEND_DELAY_MS: u32 = 500;

/// Root application component.
#[component]
fn App() -> impl IntoView {
    let state = AppState::provide();

    if let Some(message) = message_from_url() {
        spawn_local(async move {
            TimeoutFuture::new(AUTO_SEND_DELAY_MS).await;
            state.send_message(message);
        });
    }

    view! {
        <div class="app-container">
            <ChatArea />
        </div>
    }
}

fn message_from_url() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
    params.get("message").filter(|m| !m.trim().is_empty())
}

fn main() {
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        web_sys::console::error_1(&format!("Failed to init logger: {e}").into());
    }
    mount_to_body(App);
}
