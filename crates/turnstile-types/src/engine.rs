//! Execution engine event and error types.
//!
//! An engine run yields a finite, ordered sequence of `Result<AgentEvent, EngineError>`.
//! Only `TextDelta` contributes to the reply; the other events exist for logging.

use serde::{Deserialize, Serialize};

/// Events emitted while the engine processes one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A fragment of reply text, in delivery order.
    TextDelta { text: String },

    /// The agent is invoking a tool on the tool backend.
    ToolCall {
        name: String,
        arguments: serde_json::Value,
    },

    /// A tool invocation finished.
    ToolResult { name: String, is_error: bool },
}

/// Errors reported by an execution engine or its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("session '{0}' already exists")]
    AlreadyExists(String),

    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("rate limited")]
    RateLimited,

    #[error("stream error: {0}")]
    Stream(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("tool backend error: {0}")]
    ToolBackend(String),

    #[error("tool round limit of {0} reached")]
    ToolRoundLimit(u32),
}

impl EngineError {
    /// Whether this is the "already exists" outcome of a session create.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, EngineError::AlreadyExists(_))
    }
}
