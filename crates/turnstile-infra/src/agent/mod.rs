//! Tool-calling agent: the execution engine behind the gateway.
//!
//! `ToolAgent` runs the model/tool loop for one user message. Each round
//! streams a completion with the backend's tools declared; text is forwarded
//! as it arrives, and any tool calls the model makes are executed against the
//! tool backend and fed back for the next round. The turn ends at the first
//! round without tool calls.
//!
//! The engine keeps its own per-session model conversation in an
//! [`InMemorySessionService`]. A turn's messages are only committed to the
//! session once the turn completes; a failed, timed-out, or cancelled turn
//! leaves the session as it was.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use pin_project_lite::pin_project;
use tracing::{debug, info_span, warn};

use turnstile_core::engine::{EngineStream, ExecutionEngine, InMemorySessionService};
use turnstile_core::llm::{ChatModel, ToolBackend};
use turnstile_types::config::AgentConfig;
use turnstile_types::engine::{AgentEvent, EngineError};
use turnstile_types::llm::{CompletionEvent, CompletionRequest, Message};

/// An LLM agent with access to the tools of one tool backend.
pub struct ToolAgent<M, T> {
    inner: Arc<AgentInner<M, T>>,
}

struct AgentInner<M, T> {
    name: String,
    description: String,
    instruction: String,
    max_tool_rounds: u32,
    model: M,
    tools: T,
    sessions: InMemorySessionService,
}

impl<M, T> ToolAgent<M, T>
where
    M: ChatModel + 'static,
    T: ToolBackend + 'static,
{
    pub fn new(config: &AgentConfig, model: M, tools: T) -> Self {
        Self {
            inner: Arc::new(AgentInner {
                name: config.name.clone(),
                description: config.description.clone(),
                instruction: config.instruction.clone(),
                max_tool_rounds: config.max_tool_rounds.max(1),
                model,
                tools,
                sessions: InMemorySessionService::new(&config.app_name, &config.user_id),
            }),
        }
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// The engine's session store.
    pub fn sessions(&self) -> &InMemorySessionService {
        &self.inner.sessions
    }
}

impl<M, T> ExecutionEngine for ToolAgent<M, T>
where
    M: ChatModel + 'static,
    T: ToolBackend + 'static,
{
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn get_session(&self, session_id: &str) -> Result<(), EngineError> {
        self.inner.sessions.get(session_id).map(|_| ())
    }

    async fn create_session(&self, session_id: &str) -> Result<(), EngineError> {
        self.inner.sessions.create(session_id).map(|_| ())
    }

    fn run(&self, session_id: &str, message: &str) -> EngineStream {
        let span = info_span!(
            "gen_ai.invoke_agent",
            gen_ai.operation.name = "invoke_agent",
            gen_ai.agent.name = %self.inner.name,
            gen_ai.provider.name = self.inner.model.provider_name(),
            gen_ai.request.model = self.inner.model.model(),
            session_id = %session_id,
        );

        let stream = AgentInner::turn(
            Arc::clone(&self.inner),
            session_id.to_string(),
            message.to_string(),
        );

        Box::pin(StreamInSpan {
            inner: stream,
            span,
        })
    }
}

impl<M, T> AgentInner<M, T>
where
    M: ChatModel + 'static,
    T: ToolBackend + 'static,
{
    fn turn(agent: Arc<Self>, session_id: String, message: String) -> EngineStream {
        Box::pin(async_stream::try_stream! {
            let session = agent.sessions.get(&session_id)?;
            let mut messages = session.messages.lock().await.clone();
            messages.push(Message::user(message));

            let tools = agent.tools.list_tools().await?;
            let mut completed = false;

            for round in 1..=agent.max_tool_rounds {
                let request = CompletionRequest {
                    model: String::new(),
                    system: Some(agent.instruction.clone()),
                    messages: messages.clone(),
                    tools: tools.clone(),
                };
                let mut completion = agent.model.stream(request);
                let mut text = String::new();
                let mut calls = Vec::new();

                while let Some(event) = completion.next().await {
                    match event? {
                        CompletionEvent::TextDelta(delta) => {
                            text.push_str(&delta);
                            yield AgentEvent::TextDelta { text: delta };
                        }
                        CompletionEvent::ToolCall(call) => calls.push(call),
                        CompletionEvent::Finished(reason) => {
                            debug!(round, reason = %reason, "Completion finished");
                        }
                        CompletionEvent::Usage(usage) => {
                            debug!(
                                round,
                                gen_ai.usage.input_tokens = usage.input_tokens,
                                gen_ai.usage.output_tokens = usage.output_tokens,
                                "Completion usage"
                            );
                        }
                    }
                }

                if calls.is_empty() {
                    messages.push(Message::assistant(text));
                    completed = true;
                    break;
                }

                messages.push(Message::assistant_tool_calls(text, calls.clone()));
                for call in calls {
                    yield AgentEvent::ToolCall {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    };

                    match agent.tools.call_tool(&call.name, &call.arguments).await {
                        Ok(output) => {
                            yield AgentEvent::ToolResult {
                                name: call.name.clone(),
                                is_error: output.is_error,
                            };
                            messages.push(Message::tool_result(call.id, output.content));
                        }
                        Err(e) => {
                            // Reported to the model as the tool result.
                            warn!(tool = %call.name, error = %e, "Tool call failed");
                            yield AgentEvent::ToolResult {
                                name: call.name.clone(),
                                is_error: true,
                            };
                            messages.push(Message::tool_result(call.id, format!("Error: {e}")));
                        }
                    }
                }
            }

            if completed {
                *session.messages.lock().await = messages;
            } else {
                Err::<(), _>(EngineError::ToolRoundLimit(agent.max_tool_rounds))?;
            }
        })
    }
}

pin_project! {
    /// Keeps a span entered while the wrapped stream is polled.
    ///
    /// Without this, the span would close as soon as `run` returned, losing
    /// the instrumentation for the actual streaming duration.
    struct StreamInSpan<S> {
        #[pin]
        inner: S,
        span: tracing::Span,
    }
}

impl<S: Stream> Stream for StreamInSpan<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let _enter = this.span.enter();
        this.inner.poll_next(cx)
    }
}
