//! Configuration and defaults for the OpenAI-compatible client.

use std::time::Duration;

use secrecy::SecretString;

/// Base URL of Google Gemini's OpenAI-compatible endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Configuration for an OpenAI-compatible chat completions endpoint.
///
/// Used to construct an [`super::OpenAiCompatClient`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "gemini").
    pub provider_name: String,
    /// Base URL for the API; `/chat/completions` is appended.
    pub base_url: String,
    /// Bearer token. Requests are sent without `Authorization` when absent.
    pub api_key: Option<SecretString>,
    /// Model identifier (e.g., "gemini-2.5-flash").
    pub model: String,
    /// Whole-request timeout, including streaming the body.
    pub timeout: Duration,
}

/// Google Gemini default configuration.
///
/// Base URL: `https://generativelanguage.googleapis.com/v1beta/openai`
pub fn gemini_defaults(api_key: Option<SecretString>, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "gemini".into(),
        base_url: GEMINI_BASE_URL.into(),
        api_key,
        model: model.into(),
        timeout: Duration::from_secs(300),
    }
}

/// Provider name inferred from a base URL, for logs and span attributes.
pub fn provider_name_for(base_url: &str) -> &'static str {
    if base_url.contains("generativelanguage.googleapis.com") {
        "gemini"
    } else if base_url.contains("api.openai.com") {
        "openai"
    } else {
        "openai_compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_defaults() {
        let config = gemini_defaults(None, "gemini-2.5-flash");
        assert_eq!(config.provider_name, "gemini");
        assert_eq!(config.base_url, GEMINI_BASE_URL);
        assert_eq!(config.model, "gemini-2.5-flash");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_provider_name_for() {
        assert_eq!(provider_name_for(GEMINI_BASE_URL), "gemini");
        assert_eq!(provider_name_for("https://api.openai.com/v1"), "openai");
        assert_eq!(provider_name_for("http://localhost:11434/v1"), "openai_compatible");
    }
}
