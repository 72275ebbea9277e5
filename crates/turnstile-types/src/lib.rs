//! Shared domain types for Turnstile.
//!
//! This crate contains the types passed between the gateway, the execution
//! engine, and the HTTP layer: chat turns and wire bodies, model/tool message
//! shapes, agent events, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
