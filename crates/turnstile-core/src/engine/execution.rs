//! ExecutionEngine trait definition.
//!
//! Uses RPITIT for the session store calls and `Pin<Box<dyn Stream>>` for
//! `run` (streams need to be object-safe for the BoxExecutionEngine wrapper).

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use turnstile_types::engine::{AgentEvent, EngineError};

/// The ordered, finite sequence of events produced by one engine run.
///
/// The sequence ends after the first `Err` element.
pub type EngineStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, EngineError>> + Send + 'static>>;

/// A turn-based agent runtime with its own session store.
///
/// The engine is stateless per call from the gateway's point of view: every
/// call names the session it belongs to, and the engine keeps whatever
/// conversation state it needs under that id.
pub trait ExecutionEngine: Send + Sync {
    /// Human-readable engine name (the agent name).
    fn name(&self) -> &str;

    /// Check that the engine knows `session_id`.
    ///
    /// Returns `EngineError::NotFound` when it does not.
    fn get_session(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Create `session_id` in the engine's session store.
    ///
    /// Returns `EngineError::AlreadyExists` when another caller created it first.
    fn create_session(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Submit a user message and stream the engine's response.
    ///
    /// Returns a boxed stream (not RPITIT) because streams need to be
    /// object-safe for the `BoxExecutionEngine` wrapper.
    fn run(&self, session_id: &str, message: &str) -> EngineStream;
}
