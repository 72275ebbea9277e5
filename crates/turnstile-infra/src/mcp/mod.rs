//! MCP tool backend client.
//!
//! Speaks JSON-RPC 2.0 over MCP's streamable HTTP transport and implements
//! the [`ToolBackend`] port from `turnstile-core`.
//!
//! [`ToolBackend`]: turnstile_core::llm::ToolBackend

pub mod client;
pub mod types;

pub use client::{McpHttpClient, ToolBackendError};
