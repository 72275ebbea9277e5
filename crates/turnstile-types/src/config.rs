//! Configuration types for Turnstile.
//!
//! `GatewayConfig` is the shape of the optional `turnstile.toml` file. Every
//! field has a default, so an empty or missing file yields a working agent.
//! Secrets and the tool backend URL never live here; they come from the
//! environment.

use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub tool_backend: ToolBackendConfig,
}

/// The agent behind the gateway and the engine session namespace it uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    /// System instruction sent at the start of every model conversation.
    pub instruction: String,
    pub model: String,
    /// Base URL of the OpenAI-compatible chat completions endpoint.
    pub base_url: String,
    /// Upper bound on model/tool round trips within one turn.
    pub max_tool_rounds: u32,
    pub app_name: String,
    pub user_id: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "helper_agent".to_string(),
            description: "Helper agent with MCP tools.".to_string(),
            instruction:
                "You are a helpful assistant that helps users with various tasks using MCP tools."
                    .to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            max_tool_rounds: 8,
            app_name: "turnstile".to_string(),
            user_id: "default-user".to_string(),
        }
    }
}

/// How requests to the tool backend are made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolBackendConfig {
    /// Header carrying the backend token, when one is configured.
    pub auth_header: String,
    pub request_timeout_secs: u64,
}

impl Default for ToolBackendConfig {
    fn default() -> Self {
        Self {
            auth_header: "X-Tiger-Token".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.agent.name, "helper_agent");
        assert_eq!(config.agent.model, "gemini-2.5-flash");
        assert_eq!(config.agent.max_tool_rounds, 8);
        assert_eq!(config.agent.user_id, "default-user");
        assert_eq!(config.tool_backend.auth_header, "X-Tiger-Token");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let toml_str = r#"
[agent]
model = "gemini-2.5-pro"
max_tool_rounds = 3

[tool_backend]
auth_header = "Authorization"
"#;
        let config: GatewayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.model, "gemini-2.5-pro");
        assert_eq!(config.agent.max_tool_rounds, 3);
        assert_eq!(config.agent.name, "helper_agent");
        assert_eq!(config.tool_backend.auth_header, "Authorization");
        assert_eq!(config.tool_backend.request_timeout_secs, 30);
    }
}
