//! ChatGateway -- one HTTP turn against a session-scoped engine.
//!
//! A turn:
//! 1. rejects an empty message before touching the registry
//! 2. resolves (or creates) the gateway session
//! 3. takes the session's turn lock, so turns on one session run one at a time
//! 4. makes sure the engine has the session in its own store
//! 5. drains the engine's event stream in order, concatenating text
//! 6. appends the user message and reply to the session history
//!
//! The turn lock is a guard local to `handle_turn`, so every exit path
//! (validation, bootstrap failure, stream error, timeout, cancellation)
//! releases it. Steps 4 and 5 are bounded by the turn timeout, and both the
//! lock wait and each stream poll give way to the cancellation token, which
//! the server cancels once it stops waiting for in-flight turns.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use turnstile_types::chat::{ChatTurn, FALLBACK_REPLY};
use turnstile_types::engine::AgentEvent;
use turnstile_types::error::TurnError;

use crate::engine::BoxExecutionEngine;
use crate::session::SessionRegistry;

/// Error text for a missing or empty message.
pub const MESSAGE_REQUIRED: &str = "Message is required";

/// Successful outcome of a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    pub reply: String,
    pub session_id: String,
}

/// Routes chat turns to sessions and drives the execution engine.
pub struct ChatGateway {
    registry: Arc<SessionRegistry>,
    engine: Arc<BoxExecutionEngine>,
    turn_timeout: Duration,
}

impl ChatGateway {
    pub fn new(
        registry: Arc<SessionRegistry>,
        engine: Arc<BoxExecutionEngine>,
        turn_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            engine,
            turn_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Run one turn of `message` on `session_id` (or a new session).
    ///
    /// `cancel` is cancelled when the server abandons in-flight turns.
    /// Cancellation while waiting for the turn lock or while the engine is
    /// streaming ends the turn with `TurnError::Cancelled`.
    pub async fn handle_turn(
        &self,
        message: &str,
        session_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<TurnReply, TurnError> {
        if message.is_empty() {
            return Err(TurnError::Validation(MESSAGE_REQUIRED.to_string()));
        }

        let session = self.registry.get_or_create(session_id);
        let session_id = session.id().to_string();
        debug!(session_id = %session_id, message = %message, "Received chat message");

        let mut state = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(TurnError::Cancelled { session_id });
            }
            guard = session.lock() => guard,
        };

        let span = info_span!("chat_turn", session_id = %session_id, engine = self.engine.name());
        let outcome = tokio::time::timeout(
            self.turn_timeout,
            self.execute(&session_id, message, cancel),
        )
        .instrument(span)
        .await;

        let reply = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    session_id = %session_id,
                    timeout_secs = self.turn_timeout.as_secs(),
                    "Turn timed out, releasing session"
                );
                return Err(TurnError::Timeout {
                    session_id,
                    timeout_secs: self.turn_timeout.as_secs(),
                });
            }
        };

        state.history.push(ChatTurn::user(message));
        state.history.push(ChatTurn::assistant(reply.clone()));
        info!(
            session_id = %session_id,
            history_len = state.history.len(),
            reply_len = reply.len(),
            "Turn completed"
        );

        Ok(TurnReply { reply, session_id })
    }

    /// Bootstrap the engine session, then drain the engine stream.
    async fn execute(
        &self,
        session_id: &str,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TurnError> {
        self.ensure_engine_session(session_id).await?;

        let mut stream = self.engine.run(session_id, message);
        let mut reply = String::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(session_id = %session_id, "Turn abandoned by shutdown");
                    return Err(TurnError::Cancelled {
                        session_id: session_id.to_string(),
                    });
                }
                next = stream.next() => next,
            };

            match next {
                None => break,
                Some(Ok(AgentEvent::TextDelta { text })) => reply.push_str(&text),
                Some(Ok(AgentEvent::ToolCall { name, .. })) => {
                    debug!(session_id = %session_id, tool = %name, "Agent called tool");
                }
                Some(Ok(AgentEvent::ToolResult { name, is_error })) => {
                    debug!(session_id = %session_id, tool = %name, is_error, "Tool returned");
                }
                Some(Err(e)) => {
                    warn!(session_id = %session_id, error = %e, "Agent execution failed");
                    return Err(TurnError::Execution {
                        session_id: session_id.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if reply.is_empty() {
            debug!(session_id = %session_id, "Engine produced no text, using fallback reply");
            reply = FALLBACK_REPLY.to_string();
        }

        Ok(reply)
    }

    /// Make sure the engine's own store has `session_id`.
    ///
    /// A lookup failure triggers a create; losing a create race
    /// (`AlreadyExists`) counts as success.
    async fn ensure_engine_session(&self, session_id: &str) -> Result<(), TurnError> {
        let Err(lookup) = self.engine.get_session(session_id).await else {
            return Ok(());
        };
        debug!(session_id = %session_id, reason = %lookup, "Creating engine session");

        match self.engine.create_session(session_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_already_exists() => {
                debug!(session_id = %session_id, "Engine session already exists");
                Ok(())
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "Engine session bootstrap failed");
                Err(TurnError::SessionBootstrap {
                    session_id: session_id.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }
}
