//! ChatModel trait definition.
//!
//! Only streaming is modelled: the agent always consumes a completion as a
//! sequence of events, and the boxed stream keeps the trait usable behind
//! `Arc` in `'static` stream bodies.

use std::pin::Pin;

use futures_util::Stream;

use turnstile_types::engine::EngineError;
use turnstile_types::llm::{CompletionEvent, CompletionRequest};

/// Stream of events for one completion call.
pub type CompletionStream =
    Pin<Box<dyn Stream<Item = Result<CompletionEvent, EngineError>> + Send + 'static>>;

/// A chat completion backend (e.g. an OpenAI-compatible HTTP endpoint).
///
/// Implementations live in turnstile-infra (e.g., `OpenAiCompatClient`).
pub trait ChatModel: Send + Sync {
    /// Provider name used in logs and span attributes (e.g., "gemini").
    fn provider_name(&self) -> &str;

    /// Default model identifier for requests that leave `model` empty.
    fn model(&self) -> &str;

    /// Send a streaming completion request. Returns a stream of events.
    fn stream(&self, request: CompletionRequest) -> CompletionStream;
}
