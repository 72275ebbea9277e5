//! Model provider and tool backend ports used by tool-calling engines.
//!
//! - `ChatModel`: streaming chat completions with tool declarations
//! - `ToolBackend`: discovery and invocation of remote tools

pub mod provider;
pub mod tool_backend;

pub use provider::{ChatModel, CompletionStream};
pub use tool_backend::ToolBackend;
