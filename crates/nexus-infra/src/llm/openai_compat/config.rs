//! Configuration types and per-provider defaults for OpenAI-compatible providers.
//!
//! Each endpoint that speaks the OpenAI chat completions protocol gets a
//! factory function returning an [`OpenAiCompatConfig`] with the correct base
//! URL and limits.

use secrecy::SecretString;

use nexus_types::llm::ProviderCapabilities;

/// Configuration for an OpenAI-compatible LLM provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Human-readable provider name (e.g., "openrouter", "openai").
    pub provider_name: String,
    /// Base URL for the API (e.g., "https://openrouter.ai/api/v1").
    pub base_url: String,
    pub api_key: SecretString,
    /// Model used when a request leaves `model` empty.
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// OpenRouter default configuration.
///
/// Base URL: `https://openrouter.ai/api/v1`. Limits vary per routed model;
/// these are conservative values that hold for the free tier.
pub fn openrouter_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openrouter".into(),
        base_url: "https://openrouter.ai/api/v1".into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            max_output_tokens: 8_192,
        },
    }
}

/// OpenAI default configuration.
///
/// Base URL: `https://api.openai.com/v1`; 16K output tokens.
pub fn openai_defaults(api_key: SecretString, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            max_output_tokens: 16_384,
        },
    }
}

/// Configuration for any other endpoint, addressed by base URL.
pub fn custom(
    provider_name: &str,
    base_url: &str,
    api_key: SecretString,
    model: &str,
) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: provider_name.into(),
        base_url: base_url.trim_end_matches('/').into(),
        api_key,
        model: model.into(),
        capabilities: ProviderCapabilities {
            max_output_tokens: 4_096,
        },
    }
}
