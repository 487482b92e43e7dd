//! Global configuration types for Nexus.
//!
//! `GlobalConfig` represents the top-level `config.toml` that controls the
//! completion provider, the execution call policy, and the HTTP listener.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Nexus platform.
///
/// Loaded from `~/.nexus/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub execution: ExecutionSettings,

    #[serde(default)]
    pub server: ServerSettings,
}

/// Which OpenAI-compatible endpoint bots talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider name used in logs and spans (e.g., "openrouter").
    #[serde(default = "default_provider_name")]
    pub name: String,
    /// Base URL of the chat completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Model used when a request does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_provider_name() -> String {
    "openrouter".to_string()
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_model() -> String {
    "meta-llama/llama-3.3-70b-instruct:free".to_string()
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            default_model: default_model(),
        }
    }
}

/// Call policy for provider requests made by collaboration sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Upper bound on a single provider call.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Extra attempts for transient failures (rate limit, overload, timeout).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Output cap for bot clarifying questions during planning.
    #[serde(default = "default_question_max_tokens")]
    pub question_max_tokens: u32,
    /// Temperature given to new bots created without one.
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Output cap given to new bots created without one.
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    1
}

fn default_question_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f64 {
    crate::bot::DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    crate::bot::DEFAULT_MAX_TOKENS
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            question_max_tokens: default_question_max_tokens(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
        }
    }
}

/// HTTP listener settings used by `nexus serve` when no flags are given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
