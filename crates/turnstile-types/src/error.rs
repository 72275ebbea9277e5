use thiserror::Error;

/// Errors from one gateway turn.
///
/// Every variant except `Validation` carries the session id the turn was
/// resolved to, so the caller can retry on the same conversation.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("{0}")]
    Validation(String),

    #[error("Failed to create session: {message}")]
    SessionBootstrap { session_id: String, message: String },

    #[error("Failed to process message: {message}")]
    Execution { session_id: String, message: String },

    #[error("Failed to process message: agent did not finish within {timeout_secs}s")]
    Timeout { session_id: String, timeout_secs: u64 },

    #[error("Failed to process message: server is shutting down")]
    Cancelled { session_id: String },
}

impl TurnError {
    /// The session the failed turn belongs to, if one was resolved.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            TurnError::Validation(_) => None,
            TurnError::SessionBootstrap { session_id, .. }
            | TurnError::Execution { session_id, .. }
            | TurnError::Timeout { session_id, .. }
            | TurnError::Cancelled { session_id } => Some(session_id),
        }
    }
}

/// Errors from loading gateway configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {message}")]
    Invalid { name: String, message: String },
}
