use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One bubble in the chat transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub is_streaming: bool,
}

impl Message {
    pub fn user(content: String) -> Self {
        Self {
            id: format!("u_{}", uuid::Uuid::new_v4()),
            role: Role::User,
            content,
            is_streaming: false,
        }
    }

    pub fn pending_assistant(content: String) -> Self {
        Self {
            id: format!("a_{}", uuid::Uuid::new_v4()),
            role: Role::Assistant,
            content,
            is_streaming: true,
        }
    }
}

/// Body of `POST /chat`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Error shape returned by the gateway on non-2xx responses.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
