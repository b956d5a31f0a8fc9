use futures::Stream;
use futures::stream;
use gloo_net::http::Request;
use js_sys::{Promise, Reflect, Uint8Array};
use serde_json::Value;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, AbortSignal, ReadableStream, ReadableStreamDefaultReader};

use crate::models::{ChatRequest, ErrorBody};
use crate::relay::{Cancel, RelayError, is_event_stream};

/// Base URL of the chat gateway.
const API_BASE: &str = match option_env!("CHAT_API_BASE") {
    Some(base) => base,
    None => "http://localhost:8080",
};

/// Abort handle for one in-flight turn.
pub struct AbortTurn(AbortController);

impl AbortTurn {
    pub fn new() -> Result<Self, RelayError> {
        AbortController::new()
            .map(Self)
            .map_err(|e| RelayError::Network(js_message(&e)))
    }

    pub fn signal(&self) -> AbortSignal {
        self.0.signal()
    }
}

impl Cancel for AbortTurn {
    fn cancel(&self) {
        self.0.abort();
    }
}

/// Gateway answer, split on its content type.
pub enum ChatReply {
    Stream(ReadableStream),
    Blocking(Value),
}

/// Posts one chat turn to the gateway.
pub async fn send_chat(request: &ChatRequest, signal: &AbortSignal) -> Result<ChatReply, RelayError> {
    let response = Request::post(&format!("{API_BASE}/chat"))
        .abort_signal(Some(signal))
        .json(request)
        .map_err(request_failure)?
        .send()
        .await
        .map_err(request_failure)?;

    if !response.ok() {
        let message = response.json::<ErrorBody>().await.ok().map(|body| body.error);
        return Err(RelayError::Http {
            status: response.status(),
            message,
        });
    }

    if is_event_stream(response.headers().get("content-type").as_deref()) {
        let body = response
            .body()
            .ok_or_else(|| RelayError::Decode("event stream without a body".into()))?;
        Ok(ChatReply::Stream(body))
    } else {
        let json = response.json::<Value>().await.map_err(request_failure)?;
        Ok(ChatReply::Blocking(json))
    }
}

/// Reads a response body chunk by chunk.
pub fn byte_chunks(body: ReadableStream) -> impl Stream<Item = Result<Vec<u8>, RelayError>> {
    let reader: ReadableStreamDefaultReader = body.get_reader().unchecked_into();

    stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        match read_chunk(&reader).await {
            Ok(Some(bytes)) => Some((Ok(bytes), Some(reader))),
            Ok(None) => None,
            Err(err) => Some((Err(err), None)),
        }
    })
}

async fn read_chunk(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>, RelayError> {
    let result = JsFuture::from(reader.read()).await.map_err(js_failure)?;

    let done = Reflect::get(&result, &JsValue::from_str("done"))
        .map_err(js_failure)?
        .as_bool()
        .unwrap_or(true);
    if done {
        return Ok(None);
    }

    let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js_failure)?;
    Ok(Some(Uint8Array::new(&value).to_vec()))
}

/// Resolves on the next animation frame, or fails once `signal` has fired.
pub async fn next_animation_frame(signal: AbortSignal) -> Result<(), RelayError> {
    if signal.aborted() {
        return Err(RelayError::Aborted);
    }
    let window = web_sys::window().ok_or_else(|| RelayError::Network("no window".into()))?;

    let mut scheduled = Ok(0);
    let frame = Promise::new(&mut |resolve, _reject| {
        scheduled = window.request_animation_frame(&resolve);
    });
    scheduled.map_err(js_failure)?;
    JsFuture::from(frame).await.map_err(js_failure)?;

    if signal.aborted() {
        Err(RelayError::Aborted)
    } else {
        Ok(())
    }
}

fn request_failure(err: gloo_net::Error) -> RelayError {
    match err {
        gloo_net::Error::JsError(e) if e.name == "AbortError" => RelayError::Aborted,
        gloo_net::Error::SerdeError(e) => RelayError::Decode(e.to_string()),
        other => RelayError::Network(other.to_string()),
    }
}

fn js_failure(err: JsValue) -> RelayError {
    let name = Reflect::get(&err, &JsValue::from_str("name"))
        .ok()
        .and_then(|n| n.as_string());
    match name.as_deref() {
        Some("AbortError") => RelayError::Aborted,
        _ => RelayError::Network(js_message(&err)),
    }
}

fn js_message(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}
