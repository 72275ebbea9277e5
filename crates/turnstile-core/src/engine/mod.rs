//! The execution engine port.
//!
//! The gateway drives an [`ExecutionEngine`] but never implements one; the
//! concrete tool-calling agent lives in `turnstile-infra`.

pub mod box_engine;
pub mod execution;
pub mod session_service;

pub use box_engine::BoxExecutionEngine;
pub use execution::{EngineStream, ExecutionEngine};
pub use session_service::InMemorySessionService;
