//! Session registry, chat gateway, and execution engine port for Turnstile.
//!
//! This crate holds the concurrency design of the gateway: which session a
//! turn belongs to, how turns on one session are serialized, and how the
//! engine's response stream is consumed. It depends only on `turnstile-types`
//! -- never on `turnstile-infra` or any network crate.

pub mod engine;
pub mod gateway;
pub mod llm;
pub mod session;
