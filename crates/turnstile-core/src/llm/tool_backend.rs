//! ToolBackend trait definition.

use std::future::Future;

use turnstile_types::engine::EngineError;
use turnstile_types::llm::{ToolDefinition, ToolOutput};

/// A remote service exposing callable tools to the agent.
///
/// Transport failures are `Err`; a tool that ran and reported a failure is
/// `Ok` with `ToolOutput::is_error` set.
pub trait ToolBackend: Send + Sync {
    /// The tools currently offered by the backend.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<ToolDefinition>, EngineError>> + Send;

    /// Invoke `name` with JSON `arguments`.
    fn call_tool(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> impl Future<Output = Result<ToolOutput, EngineError>> + Send;
}
