//! Gateway configuration loader for Turnstile.
//!
//! Two sources feed the running gateway:
//! - an optional TOML file deserialized into [`GatewayConfig`], falling back
//!   to defaults when the file is missing or malformed
//! - process environment variables ([`Environment`]) carrying the secrets and
//!   the tool backend endpoint, which is required

use std::path::Path;

use secrecy::SecretString;

use turnstile_types::config::GatewayConfig;
use turnstile_types::error::ConfigError;

/// Config file looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "turnstile.toml";

/// Model provider API key.
pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
/// Tool backend URL (required).
pub const ENV_MCP_ENDPOINT: &str = "MCP_ENDPOINT";
/// Optional token forwarded to the tool backend.
pub const ENV_TOOL_TOKEN: &str = "X_TIGER_TOKEN";

/// Load gateway configuration from `path`.
///
/// - If the file does not exist, returns [`GatewayConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_gateway_config(path: &Path) -> GatewayConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            GatewayConfig::default()
        }
    }
}

/// Settings read from environment variables.
///
/// Does not derive Debug: both secrets stay out of log output.
pub struct Environment {
    pub api_key: Option<SecretString>,
    pub mcp_endpoint: String,
    pub tool_token: Option<SecretString>,
}

impl Environment {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] when `MCP_ENDPOINT` is unset or
    /// empty, and [`ConfigError::Invalid`] when it is not an absolute URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mcp_endpoint = get(ENV_MCP_ENDPOINT).ok_or(ConfigError::MissingVar(ENV_MCP_ENDPOINT))?;
        reqwest::Url::parse(&mcp_endpoint).map_err(|e| ConfigError::Invalid {
            name: ENV_MCP_ENDPOINT.to_string(),
            message: e.to_string(),
        })?;

        let api_key = get(ENV_API_KEY).map(SecretString::from);
        if api_key.is_none() {
            tracing::warn!("{ENV_API_KEY} is not set; model requests will be unauthenticated");
        }

        let tool_token = get(ENV_TOOL_TOKEN).map(SecretString::from);
        if tool_token.is_none() {
            tracing::warn!("{ENV_TOOL_TOKEN} is not set; tool backend requests will carry no token");
        }

        Ok(Self {
            api_key,
            mcp_endpoint,
            tool_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[tokio::test]
    async fn load_gateway_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_gateway_config(&tmp.path().join(DEFAULT_CONFIG_FILE)).await;
        assert_eq!(config, GatewayConfig::default());
    }

    #[tokio::test]
    async fn load_gateway_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(
            &path,
            r#"
[agent]
name = "ops_agent"
instruction = "Answer operations questions."
max_tool_rounds = 4

[tool_backend]
request_timeout_secs = 10
"#,
        )
        .await
        .unwrap();

        let config = load_gateway_config(&path).await;
        assert_eq!(config.agent.name, "ops_agent");
        assert_eq!(config.agent.max_tool_rounds, 4);
        assert_eq!(config.agent.model, "gemini-2.5-flash");
        assert_eq!(config.tool_backend.request_timeout_secs, 10);
    }

    #[tokio::test]
    async fn load_gateway_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(DEFAULT_CONFIG_FILE);
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_gateway_config(&path).await;
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn environment_requires_mcp_endpoint() {
        let result = Environment::from_lookup(lookup(&[(ENV_API_KEY, "key")]));
        assert!(matches!(result, Err(ConfigError::MissingVar("MCP_ENDPOINT"))));
    }

    #[test]
    fn environment_treats_empty_endpoint_as_missing() {
        let result = Environment::from_lookup(lookup(&[(ENV_MCP_ENDPOINT, "  ")]));
        assert!(matches!(result, Err(ConfigError::MissingVar(_))));
    }

    #[test]
    fn environment_rejects_relative_endpoint() {
        let result = Environment::from_lookup(lookup(&[(ENV_MCP_ENDPOINT, "/mcp")]));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn environment_reads_all_values() {
        let env = Environment::from_lookup(lookup(&[
            (ENV_MCP_ENDPOINT, "http://localhost:9000/mcp"),
            (ENV_API_KEY, "google-key"),
            (ENV_TOOL_TOKEN, "tiger"),
        ]))
        .unwrap();

        assert_eq!(env.mcp_endpoint, "http://localhost:9000/mcp");
        assert_eq!(env.api_key.unwrap().expose_secret(), "google-key");
        assert_eq!(env.tool_token.unwrap().expose_secret(), "tiger");
    }

    #[test]
    fn environment_optional_values_may_be_absent() {
        let env =
            Environment::from_lookup(lookup(&[(ENV_MCP_ENDPOINT, "http://localhost:9000/mcp")]))
                .unwrap();
        assert!(env.api_key.is_none());
        assert!(env.tool_token.is_none());
    }
}
