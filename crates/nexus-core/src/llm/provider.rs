//! LlmProvider trait definition.
//!
//! This is the core abstraction that every chat-completion backend
//! implements. Uses RPITIT for `complete`; `BoxLlmProvider` supplies the
//! object-safe wrapper for runtime dispatch.

use nexus_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

/// Trait for chat-completion backends (OpenRouter, OpenAI, ...).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
///
/// Implementations live in nexus-infra (e.g., `OpenAiCompatibleProvider`).
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openrouter").
    fn name(&self) -> &str;

    /// Context and output limits of the backend.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
