//! Application state wiring the gateway together.
//!
//! AppState holds the `ChatGateway` (pinned to the concrete `ToolAgent` over
//! the OpenAI-compatible client and the MCP client), the facts the info
//! endpoints report, and the token that abandons in-flight turns.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use turnstile_core::engine::BoxExecutionEngine;
use turnstile_core::gateway::ChatGateway;
use turnstile_core::session::SessionRegistry;
use turnstile_infra::agent::ToolAgent;
use turnstile_infra::config::{DEFAULT_CONFIG_FILE, Environment, load_gateway_config};
use turnstile_infra::llm::OpenAiCompatClient;
use turnstile_infra::llm::openai_compat::config::{gemini_defaults, provider_name_for};
use turnstile_infra::mcp::McpHttpClient;

use crate::cli::ServeArgs;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ChatGateway>,
    pub agent_description: Arc<str>,
    pub mcp_endpoint: Arc<str>,
    /// Cancelled when the shutdown drain deadline passes; in-flight turns
    /// abort on it.
    pub turn_cancel: CancellationToken,
}

impl AppState {
    /// Load configuration and build the agent, engine, and gateway.
    pub async fn init(args: &ServeArgs, turn_cancel: CancellationToken) -> anyhow::Result<Self> {
        let config_path = args
            .config
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let config = load_gateway_config(config_path).await;
        let env = Environment::from_env()?;

        let mut model_config = gemini_defaults(env.api_key, &config.agent.model);
        model_config.provider_name = provider_name_for(&config.agent.base_url).to_string();
        model_config.base_url = config.agent.base_url.clone();
        let model = OpenAiCompatClient::new(model_config)?;

        let tools = McpHttpClient::new(
            env.mcp_endpoint.clone(),
            &config.tool_backend.auth_header,
            env.tool_token,
            Duration::from_secs(config.tool_backend.request_timeout_secs),
        )?;

        let agent = ToolAgent::new(&config.agent, model, tools);
        let agent_description: Arc<str> = agent.description().into();

        let gateway = ChatGateway::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(BoxExecutionEngine::new(agent)),
            Duration::from_secs(args.turn_timeout_secs),
        );

        Ok(Self {
            gateway: Arc::new(gateway),
            agent_description,
            mcp_endpoint: env.mcp_endpoint.into(),
            turn_cancel,
        })
    }
}
