//! OpenAI SSE stream to [`CompletionEvent`] adapter.
//!
//! Tool call arguments arrive as partial JSON fragments across multiple
//! streaming chunks (keyed by tool call index). These are accumulated and
//! emitted as [`CompletionEvent::ToolCall`] when a finish_reason is received
//! or the stream ends.

use std::collections::BTreeMap;
use std::fmt::Display;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};

use turnstile_core::llm::CompletionStream;
use turnstile_types::engine::EngineError;
use turnstile_types::llm::{CompletionEvent, StopReason, ToolCall, Usage};

use super::types::ChatCompletionChunk;

/// Accumulates partial JSON fragments for a tool call during streaming.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    json_buffer: String,
}

impl ToolCallAccumulator {
    fn finish(self) -> Result<ToolCall, EngineError> {
        let arguments = if self.json_buffer.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_json::from_str(&self.json_buffer).map_err(|e| {
                EngineError::Deserialization(format!("tool call JSON for '{}': {e}", self.name))
            })?
        };
        Ok(ToolCall {
            id: self.id,
            name: self.name,
            arguments,
        })
    }
}

/// Map a finish_reason string to a [`StopReason`].
pub fn map_finish_reason(reason: &str) -> StopReason {
    match reason {
        "length" => StopReason::MaxTokens,
        "tool_calls" | "function_call" => StopReason::ToolUse,
        "content_filter" => StopReason::ContentFilter,
        _ => StopReason::EndTurn,
    }
}

/// Drain accumulated tool calls in index order.
fn drain_tool_calls(
    accumulators: &mut BTreeMap<u32, ToolCallAccumulator>,
) -> Result<Vec<ToolCall>, EngineError> {
    std::mem::take(accumulators)
        .into_values()
        .map(ToolCallAccumulator::finish)
        .collect()
}

/// Map a raw SSE byte stream from `/chat/completions` to completion events.
///
/// The returned stream emits text deltas as they arrive, then any assembled
/// tool calls and a `Finished` event per finish_reason, and usage when the
/// server reports it. It ends at `data: [DONE]` or when the body ends.
pub fn completion_events<S, B, E>(body: S) -> CompletionStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut events = Box::pin(body.eventsource());
        let mut accumulators: BTreeMap<u32, ToolCallAccumulator> = BTreeMap::new();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| EngineError::Stream(e.to_string()))?;
            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                break;
            }

            let chunk: ChatCompletionChunk = serde_json::from_str(data)
                .map_err(|e| EngineError::Deserialization(format!("stream chunk: {e}")))?;

            if let Some(usage) = chunk.usage {
                yield CompletionEvent::Usage(Usage {
                    input_tokens: usage.prompt_tokens,
                    output_tokens: usage.completion_tokens,
                });
            }

            for choice in chunk.choices {
                if let Some(text) = choice.delta.content {
                    if !text.is_empty() {
                        yield CompletionEvent::TextDelta(text);
                    }
                }

                for (position, tc) in choice.delta.tool_calls.into_iter().enumerate() {
                    let index = tc.index.unwrap_or(position as u32);
                    let acc = accumulators.entry(index).or_default();

                    // id/name arrive on the first fragment only.
                    if let Some(id) = tc.id.filter(|id| !id.is_empty()) {
                        acc.id = id;
                    }
                    if let Some(function) = tc.function {
                        if let Some(name) = function.name.filter(|n| !n.is_empty()) {
                            acc.name = name;
                        }
                        if let Some(arguments) = function.arguments {
                            acc.json_buffer.push_str(&arguments);
                        }
                    }
                }

                if let Some(reason) = choice.finish_reason {
                    for call in drain_tool_calls(&mut accumulators)? {
                        yield CompletionEvent::ToolCall(call);
                    }
                    yield CompletionEvent::Finished(map_finish_reason(&reason));
                }
            }
        }

        // Some endpoints end the stream without a finish_reason.
        for call in drain_tool_calls(&mut accumulators)? {
            yield CompletionEvent::ToolCall(call);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn sse(chunks: Vec<&'static str>) -> CompletionStream {
        completion_events(futures_util::stream::iter(
            chunks.into_iter().map(Ok::<_, Infallible>),
        ))
    }

    async fn collect(stream: CompletionStream) -> Vec<Result<CompletionEvent, EngineError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_text_deltas_in_order() {
        let events = collect(sse(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        ]))
        .await;

        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            events,
            vec![
                CompletionEvent::TextDelta("Hel".to_string()),
                CompletionEvent::TextDelta("lo".to_string()),
                CompletionEvent::Finished(StopReason::EndTurn),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_call_fragments_are_assembled() {
        let events = collect(sse(vec![
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_1\",\"function\":{\"name\":\"search\",\"arguments\":\"{\\\"q\\\":\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\" \\\"rust\\\"}\"}}]}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"tool_calls\"}]}\n\n",
        ]))
        .await;

        let events: Vec<_> = events.into_iter().map(Result::unwrap).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            CompletionEvent::ToolCall(call) => {
                assert_eq!(call.id, "call_1");
                assert_eq!(call.name, "search");
                assert_eq!(call.arguments["q"], "rust");
            }
            other => panic!("expected tool call, got {other:?}"),
        }
        assert_eq!(events[1], CompletionEvent::Finished(StopReason::ToolUse));
    }

    #[tokio::test]
    async fn test_tool_call_without_index_or_finish_reason() {
        let events = collect(sse(vec![
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"id\":\"a\",\"function\":{\"name\":\"one\",\"arguments\":\"\"}},{\"id\":\"b\",\"function\":{\"name\":\"two\",\"arguments\":\"{\\\"x\\\":1}\"}}]}}]}\n\n",
        ]))
        .await;

        let calls: Vec<_> = events
            .into_iter()
            .map(Result::unwrap)
            .filter_map(|e| match e {
                CompletionEvent::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "one");
        assert!(calls[0].arguments.as_object().unwrap().is_empty());
        assert_eq!(calls[1].arguments["x"], 1);
    }

    #[tokio::test]
    async fn test_usage_chunk() {
        let events = collect(sse(vec![
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":12,\"completion_tokens\":3}}\n\n",
        ]))
        .await;
        assert_eq!(
            events[0].as_ref().unwrap(),
            &CompletionEvent::Usage(Usage {
                input_tokens: 12,
                output_tokens: 3
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_an_error() {
        let events = collect(sse(vec!["data: {not json}\n\n"])).await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(EngineError::Deserialization(_))));
    }

    #[tokio::test]
    async fn test_malformed_tool_arguments_are_an_error() {
        let events = collect(sse(vec![
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"c\",\"function\":{\"name\":\"f\",\"arguments\":\"{oops\"}}]},\"finish_reason\":\"tool_calls\"}]}\n\n",
        ]))
        .await;
        assert!(events.iter().any(|e| matches!(e, Err(EngineError::Deserialization(_)))));
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason("stop"), StopReason::EndTurn);
        assert_eq!(map_finish_reason("length"), StopReason::MaxTokens);
        assert_eq!(map_finish_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(map_finish_reason("content_filter"), StopReason::ContentFilter);
        assert_eq!(map_finish_reason("something_new"), StopReason::EndTurn);
    }
}
