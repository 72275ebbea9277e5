//! OpenAI-compatible chat model client.
//!
//! A single [`OpenAiCompatClient`] speaks the OpenAI chat completions
//! protocol with streaming and function calling. The default configuration
//! targets Google Gemini's OpenAI-compatible endpoint.
//!
//! The request and chunk types are hand-written (see [`types`]) and the SSE
//! body is decoded with `eventsource-stream` (see [`streaming`]).

pub mod config;
pub mod streaming;
pub mod types;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use turnstile_core::llm::{ChatModel, CompletionStream};
use turnstile_types::engine::EngineError;
use turnstile_types::llm::CompletionRequest;

use self::config::OpenAiCompatConfig;
use self::streaming::completion_events;
use self::types::ChatCompletionRequest;

/// Streaming client for any OpenAI-compatible API.
///
/// # API Key Security
///
/// Does NOT derive Debug. The API key is stored as a [`SecretString`] and is
/// only exposed when building the `Authorization` header.
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    provider_name: String,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiCompatClient {
    /// Create a new client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Provider`] if the HTTP client cannot be built.
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            provider_name: config.provider_name,
            base_url: config.base_url,
            api_key: config.api_key,
            model: config.model,
        })
    }

    /// Create a Google Gemini client.
    pub fn gemini(api_key: Option<SecretString>, model: &str) -> Result<Self, EngineError> {
        Self::new(config::gemini_defaults(api_key, model))
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl ChatModel for OpenAiCompatClient {
    fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn stream(&self, request: CompletionRequest) -> CompletionStream {
        let body = ChatCompletionRequest::streaming(&request, &self.model);
        debug!(
            provider = %self.provider_name,
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "Sending chat completion request"
        );

        let mut builder = self
            .client
            .post(self.url())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        Box::pin(async_stream::try_stream! {
            let response = builder.send().await.map_err(|e| EngineError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

            let status = response.status();
            if !status.is_success() {
                let error_body = response.text().await.unwrap_or_default();
                Err::<(), _>(map_status_error(status.as_u16(), error_body))?;
            } else {
                use futures_util::StreamExt;
                let mut inner = completion_events(response.bytes_stream());
                while let Some(event) = inner.next().await {
                    yield event?;
                }
            }
        })
    }
}

/// Map a non-success HTTP status to an [`EngineError`].
fn map_status_error(status: u16, body: String) -> EngineError {
    match status {
        401 | 403 => EngineError::AuthenticationFailed,
        429 => EngineError::RateLimited,
        _ => EngineError::Provider {
            message: format!("HTTP {status}: {body}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use turnstile_types::llm::{CompletionEvent, Message};

    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn client(base_url: String, api_key: Option<&str>) -> OpenAiCompatClient {
        OpenAiCompatClient::new(OpenAiCompatConfig {
            provider_name: "test".to_string(),
            base_url,
            api_key: api_key.map(SecretString::from),
            model: "test-model".to_string(),
            timeout: std::time::Duration::from_secs(5),
        })
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: String::new(),
            system: None,
            messages: vec![Message::user("Hi")],
            tools: Vec::new(),
        }
    }

    #[test]
    fn test_url_joins_base() {
        let c = client("http://localhost:1234/v1/".to_string(), None);
        assert_eq!(c.url(), "http://localhost:1234/v1/chat/completions");
        assert_eq!(c.provider_name(), "test");
        assert_eq!(c.model(), "test-model");
    }

    #[test]
    fn test_map_status_error() {
        assert!(matches!(
            map_status_error(401, String::new()),
            EngineError::AuthenticationFailed
        ));
        assert!(matches!(map_status_error(429, String::new()), EngineError::RateLimited));
        assert!(
            matches!(map_status_error(500, "boom".into()), EngineError::Provider { message } if message.contains("boom"))
        );
    }

    #[tokio::test]
    async fn test_streams_from_server() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap| async move {
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer secret")
                );
                (
                    [("content-type", "text/event-stream")],
                    "data: {\"choices\":[{\"delta\":{\"content\":\"Hi \"}}]}\n\n\
                     data: {\"choices\":[{\"delta\":{\"content\":\"there\"},\"finish_reason\":\"stop\"}]}\n\n\
                     data: [DONE]\n\n",
                )
            }),
        );
        let base = serve(router).await;

        let events: Vec<_> = client(base, Some("secret")).stream(request()).collect().await;
        let text: String = events
            .into_iter()
            .filter_map(|e| match e.unwrap() {
                CompletionEvent::TextDelta(t) => Some(t),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Hi there");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { StatusCode::TOO_MANY_REQUESTS.into_response() }),
        );
        let base = serve(router).await;

        let events: Vec<_> = client(base, None).stream(request()).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Err(EngineError::RateLimited)));
    }
}
