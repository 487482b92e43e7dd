//! LLM provider implementations.
//!
//! Contains the OpenAI-compatible implementation of the [`LlmProvider`]
//! trait defined in `nexus-core`, plus a factory ([`create_provider`]) that
//! builds it from the `[provider]` section of `config.toml`.
//!
//! [`LlmProvider`]: nexus_core::llm::provider::LlmProvider

pub mod openai_compat;

use secrecy::SecretString;
use tracing::{debug, warn};

use nexus_core::llm::box_provider::BoxLlmProvider;
use nexus_core::llm::provider::LlmProvider;
use nexus_types::config::ProviderSettings;
use nexus_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

use self::openai_compat::OpenAiCompatibleProvider;
use self::openai_compat::config;

/// Create a [`BoxLlmProvider`] from provider settings.
///
/// Well-known names on their default base URL use the matching preset;
/// anything else is treated as a custom endpoint at `settings.base_url`.
pub fn create_provider(
    settings: &ProviderSettings,
    api_key: Option<SecretString>,
) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key.ok_or(LlmError::AuthenticationFailed)?;
    let base_url = settings.base_url.trim_end_matches('/');

    let provider = match settings.name.as_str() {
        "openrouter" if base_url == "https://openrouter.ai/api/v1" => {
            OpenAiCompatibleProvider::openrouter(key, &settings.default_model)
        }
        "openai" if base_url == "https://api.openai.com/v1" => {
            OpenAiCompatibleProvider::openai(key, &settings.default_model)
        }
        name => OpenAiCompatibleProvider::new(config::custom(
            name,
            base_url,
            key,
            &settings.default_model,
        )),
    };
    debug!(provider = %settings.name, base_url, "created completion provider");
    Ok(BoxLlmProvider::new(provider))
}

/// Read the provider API key from the environment variable named in settings.
pub fn api_key_from_env(settings: &ProviderSettings) -> Option<SecretString> {
    std::env::var(&settings.api_key_env)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Stand-in used when no API key is available.
///
/// Roster management and session bookkeeping keep working; every
/// completion fails with [`LlmError::AuthenticationFailed`].
pub struct UnconfiguredProvider {
    name: String,
    capabilities: ProviderCapabilities,
}

impl UnconfiguredProvider {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            name: settings.name.clone(),
            capabilities: ProviderCapabilities {
                max_output_tokens: u32::MAX,
            },
        }
    }
}

impl LlmProvider for UnconfiguredProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::AuthenticationFailed)
    }
}

/// Build the configured provider, or an [`UnconfiguredProvider`] when the
/// key env var is unset.
pub fn provider_from_settings(settings: &ProviderSettings) -> BoxLlmProvider {
    match create_provider(settings, api_key_from_env(settings)) {
        Ok(provider) => provider,
        Err(e) => {
            warn!(
                provider = %settings.name,
                env = %settings.api_key_env,
                error = %e,
                "completion provider unavailable, bot calls will fail"
            );
            BoxLlmProvider::new(UnconfiguredProvider::new(settings))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_openrouter_default() {
        let settings = ProviderSettings::default();
        let provider =
            create_provider(&settings, Some(SecretString::from("sk-or".to_string()))).unwrap();
        assert_eq!(provider.name(), "openrouter");
        assert_eq!(provider.capabilities().max_output_tokens, 8_192);
    }

    #[test]
    fn test_create_provider_custom_endpoint() {
        let settings = ProviderSettings {
            name: "local".to_string(),
            base_url: "http://localhost:11434/v1".to_string(),
            api_key_env: "LOCAL_KEY".to_string(),
            default_model: "llama3".to_string(),
        };
        let provider =
            create_provider(&settings, Some(SecretString::from("none".to_string()))).unwrap();
        assert_eq!(provider.name(), "local");
    }

    #[test]
    fn test_create_provider_missing_key() {
        let result = create_provider(&ProviderSettings::default(), None);
        assert!(matches!(result, Err(LlmError::AuthenticationFailed)));
    }

    #[test]
    fn test_api_key_from_env_missing() {
        let settings = ProviderSettings {
            api_key_env: "NEXUS_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ProviderSettings::default()
        };
        assert!(api_key_from_env(&settings).is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_rejects_calls() {
        let settings = ProviderSettings {
            api_key_env: "NEXUS_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..ProviderSettings::default()
        };
        let provider = provider_from_settings(&settings);
        assert_eq!(provider.name(), "openrouter");

        let request = CompletionRequest {
            model: settings.default_model.clone(),
            messages: vec![nexus_types::llm::Message::user("hi")],
            max_tokens: 10,
            temperature: None,
        };
        let result = provider.complete(&request).await;
        assert!(matches!(result, Err(LlmError::AuthenticationFailed)));
    }
}
