//! MCP client over streamable HTTP.
//!
//! Every message is a JSON-RPC POST to the configured endpoint. The first
//! request triggers the handshake (`initialize` then
//! `notifications/initialized`); the `Mcp-Session-Id` returned by the server
//! is sent on every later request. A 404 on a request that carried a session
//! id means the server dropped the session: the handshake runs again and the
//! request is retried once. Responses arrive either as a JSON body or as an
//! SSE body whose `data:` lines carry the JSON-RPC response.

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use turnstile_core::llm::ToolBackend;
use turnstile_types::engine::EngineError;
use turnstile_types::llm::{ToolDefinition, ToolOutput};

use super::types::{
    ClientInfo, InitializeParams, InitializeResult, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, PROTOCOL_VERSION, ToolsCallParams, ToolsCallResult, ToolsListResult,
};

/// Session header of the streamable HTTP transport.
pub const MCP_SESSION_HEADER: &str = "mcp-session-id";

/// Upper bound on `tools/list` pages fetched for one tool list.
const MAX_TOOL_PAGES: usize = 64;

/// Errors talking to the tool backend.
#[derive(Debug, thiserror::Error)]
pub enum ToolBackendError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    Protocol(String),

    #[error("invalid auth header name '{0}'")]
    InvalidHeader(String),
}

impl From<ToolBackendError> for EngineError {
    fn from(err: ToolBackendError) -> Self {
        EngineError::ToolBackend(err.to_string())
    }
}

/// MCP client bound to one tool backend endpoint.
///
/// Does NOT derive Debug: it holds the backend token.
pub struct McpHttpClient {
    http: reqwest::Client,
    endpoint: String,
    auth: Option<(HeaderName, SecretString)>,
    next_id: AtomicU64,
    /// Set once the handshake succeeded; cleared when the server expires it.
    session: Mutex<Option<McpSession>>,
    /// Tool list, cached after the first successful `tools/list`.
    tools: OnceCell<Vec<ToolDefinition>>,
}

/// State of one completed handshake.
struct McpSession {
    /// `None` when the server issued no session id.
    id: Option<String>,
}

impl McpHttpClient {
    /// Create a client for `endpoint`.
    ///
    /// When `token` is present it is sent in the `auth_header` header on every
    /// request.
    ///
    /// # Errors
    ///
    /// Returns an error if `auth_header` is not a valid header name or the
    /// HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        auth_header: &str,
        token: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ToolBackendError> {
        let auth = match token {
            Some(token) => {
                let name = HeaderName::from_bytes(auth_header.as_bytes())
                    .map_err(|_| ToolBackendError::InvalidHeader(auth_header.to_string()))?;
                Some((name, token))
            }
            None => None,
        };

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolBackendError::Http(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            auth,
            next_id: AtomicU64::new(1),
            session: Mutex::new(None),
            tools: OnceCell::new(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a JSON-RPC request and return its `result`.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, ToolBackendError> {
        let session = self.session().await?;

        match self.send(method, params.clone(), session.as_deref()).await {
            Err(ToolBackendError::Status { status: 404, .. }) if session.is_some() => {
                info!(endpoint = %self.endpoint, method = %method, "Tool backend session expired, re-initializing");
                self.expire_session(session.as_deref()).await;
                let session = self.session().await?;
                self.send(method, params, session.as_deref()).await
            }
            other => other,
        }
    }

    async fn send(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
        session: Option<&str>,
    ) -> Result<serde_json::Value, ToolBackendError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        debug!(endpoint = %self.endpoint, method = %method, id, "Tool backend request");

        let response = self
            .post(&JsonRpcRequest::new(id, method, params), session)
            .await?;
        read_result(response, id).await
    }

    /// Session id of the current handshake, running the handshake first if
    /// there is none. Concurrent callers wait for a single handshake.
    async fn session(&self) -> Result<Option<String>, ToolBackendError> {
        let mut current = self.session.lock().await;
        if let Some(session) = current.as_ref() {
            return Ok(session.id.clone());
        }

        let session = self.initialize().await?;
        let id = session.id.clone();
        *current = Some(session);
        Ok(id)
    }

    /// Forget the session `expired`, unless another caller already replaced it.
    async fn expire_session(&self, expired: Option<&str>) {
        let mut current = self.session.lock().await;
        if current.as_ref().is_some_and(|s| s.id.as_deref() == expired) {
            *current = None;
        }
    }

    async fn initialize(&self) -> Result<McpSession, ToolBackendError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: serde_json::json!({}),
            client_info: ClientInfo {
                name: "turnstile".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };
        let params =
            serde_json::to_value(&params).map_err(|e| ToolBackendError::Protocol(e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response = self
            .post(&JsonRpcRequest::new(id, "initialize", Some(params)), None)
            .await?;
        let session = response
            .headers()
            .get(MCP_SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let result: InitializeResult = serde_json::from_value(read_result(response, id).await?)
            .map_err(|e| ToolBackendError::Protocol(format!("initialize result: {e}")))?;

        info!(
            endpoint = %self.endpoint,
            protocol = %result.protocol_version,
            server_name = result.server_info.as_ref().map(|s| s.name.as_str()).unwrap_or("unknown"),
            has_session = session.is_some(),
            "Tool backend initialized"
        );

        let notification = JsonRpcNotification {
            jsonrpc: "2.0",
            method: "notifications/initialized".into(),
            params: None,
        };
        self.post(&notification, session.as_deref()).await?;

        Ok(McpSession { id: session })
    }

    async fn post<T: Serialize>(
        &self,
        body: &T,
        session: Option<&str>,
    ) -> Result<reqwest::Response, ToolBackendError> {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(body);
        if let Some((name, token)) = &self.auth {
            builder = builder.header(name.clone(), token.expose_secret());
        }
        if let Some(session) = session {
            builder = builder.header(MCP_SESSION_HEADER, session);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ToolBackendError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolBackendError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch_tools(&self) -> Result<Vec<ToolDefinition>, ToolBackendError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();
        let mut pages = 0;

        loop {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let page: ToolsListResult = serde_json::from_value(self.request("tools/list", params).await?)
                .map_err(|e| ToolBackendError::Protocol(format!("tools/list result: {e}")))?;
            pages += 1;

            tools.extend(page.tools.into_iter().map(ToolDefinition::from));
            let Some(next) = page.next_cursor.filter(|c| !c.is_empty()) else {
                break;
            };
            if pages >= MAX_TOOL_PAGES {
                warn!(endpoint = %self.endpoint, pages, "Tool list truncated at page limit");
                break;
            }
            if !seen_cursors.insert(next.clone()) {
                warn!(endpoint = %self.endpoint, cursor = %next, "Tool backend repeated a list cursor, stopping");
                break;
            }
            cursor = Some(next);
        }

        debug!(endpoint = %self.endpoint, count = tools.len(), pages, "Fetched tool list");
        Ok(tools)
    }
}

impl ToolBackend for McpHttpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>, EngineError> {
        let tools = self.tools.get_or_try_init(|| self.fetch_tools()).await?;
        Ok(tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<ToolOutput, EngineError> {
        // MCP requires an object here.
        let arguments = if arguments.is_object() {
            arguments.clone()
        } else {
            serde_json::json!({})
        };
        let params = serde_json::to_value(ToolsCallParams {
            name: name.to_string(),
            arguments,
        })
        .map_err(|e| EngineError::ToolBackend(e.to_string()))?;

        let result: ToolsCallResult = serde_json::from_value(self.request("tools/call", Some(params)).await?)
            .map_err(|e| ToolBackendError::Protocol(format!("tools/call result: {e}")))?;

        let is_error = result.is_error;
        Ok(ToolOutput {
            content: result.into_text(),
            is_error,
        })
    }
}

/// Read a JSON-RPC response for request `id` and return its `result`.
async fn read_result(
    response: reqwest::Response,
    id: u64,
) -> Result<serde_json::Value, ToolBackendError> {
    let is_sse = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"));

    let body = response
        .bytes()
        .await
        .map_err(|e| ToolBackendError::Http(e.to_string()))?
        .to_vec();

    let rpc = if is_sse {
        parse_sse_response(body, id).await?
    } else {
        serde_json::from_slice::<JsonRpcResponse>(&body)
            .map_err(|e| ToolBackendError::Protocol(format!("JSON-RPC response: {e}")))?
    };

    if let Some(err) = rpc.error {
        return Err(ToolBackendError::Rpc {
            code: err.code,
            message: err.message,
        });
    }
    rpc.result
        .ok_or_else(|| ToolBackendError::Protocol("response has no result".into()))
}

/// Find the JSON-RPC response for `id` among the events of an SSE body.
async fn parse_sse_response(body: Vec<u8>, id: u64) -> Result<JsonRpcResponse, ToolBackendError> {
    let mut events =
        std::pin::pin!(futures_util::stream::iter([Ok::<_, Infallible>(body)]).eventsource());

    while let Some(event) = events.next().await {
        let event = event.map_err(|e| ToolBackendError::Protocol(e.to_string()))?;
        if event.data.trim().is_empty() {
            continue;
        }
        // Server-initiated messages may precede the response; skip them.
        let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&event.data) else {
            continue;
        };
        if response.id.as_ref().and_then(serde_json::Value::as_u64) == Some(id) {
            return Ok(response);
        }
    }

    Err(ToolBackendError::Protocol(format!(
        "no response for request {id} in event stream"
    )))
}
