//! Infrastructure layer for Turnstile.
//!
//! Contains the concrete collaborators behind the ports defined in
//! `turnstile-core`: configuration loading, the OpenAI-compatible streaming
//! chat client, the MCP tool backend client, and `ToolAgent`, the execution
//! engine that ties them together.

pub mod agent;
pub mod config;
pub mod llm;
pub mod mcp;
