//! Model provider clients.
//!
//! Contains the concrete implementation of the [`ChatModel`] trait defined in
//! `turnstile-core`: a single OpenAI-compatible client pointed at Gemini's
//! OpenAI endpoint by default.
//!
//! [`ChatModel`]: turnstile_core::llm::ChatModel

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;
