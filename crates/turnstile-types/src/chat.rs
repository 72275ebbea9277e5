//! Chat turn and wire body types for Turnstile.
//!
//! `ChatTurn` is one entry in a gateway session's history. `ChatRequest` and
//! `ChatResponse` are the JSON bodies of `POST /api/chat`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export MessageRole from llm module (it's used in both chat and llm contexts).
pub use crate::llm::MessageRole;

/// Reply substituted when the engine finishes a turn without producing text.
pub const FALLBACK_REPLY: &str = "The agent processed the message but returned no response.";

/// One message in a session's conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Request body for `POST /api/chat`.
///
/// A missing `message` deserializes to an empty string so it is reported as
/// "Message is required" rather than as malformed JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Existing session to continue; absent or empty starts a new one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Response body for `POST /api/chat`.
///
/// Always returned with HTTP 200; callers must inspect `error`. Empty
/// `response`/`session_id` fields are omitted so an early validation failure
/// serializes as just `{"error": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub response: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// A successful turn.
    pub fn reply(response: String, session_id: String) -> Self {
        Self {
            response,
            session_id,
            error: None,
        }
    }

    /// A failed turn. `session_id` is `None` when no session was resolved.
    pub fn failure(error: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            response: String::new(),
            session_id: session_id.unwrap_or_default(),
            error: Some(error.into()),
        }
    }
}
