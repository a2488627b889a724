//! LLM access: the [`ChatModel`] seam and its edgequake-llm implementation.
//!
//! Handlers never talk to a provider directly. They go through [`ChatModel`],
//! a two-method trait covering everything this service asks of a model: a
//! plain text completion (keyword extraction, answer generation) and a
//! vision completion over one page image (Markdown transcription). The seam
//! exists so tests can substitute a canned model and assert on what was —
//! and was not — called.
//!
//! Retry policy lives with the callers: page transcription retries in
//! [`crate::pipeline::extract`], keyword/answer calls are single-shot.

use crate::config::ServiceConfig;
use crate::error::ChatPdfError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// The service's view of a chat-completion model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run a plain text completion and return the model's reply.
    async fn complete(&self, prompt: &str) -> Result<String, ChatPdfError>;

    /// Run a vision completion: `prompt` as the system message, `image` as
    /// the sole user attachment. Returns the model's transcription.
    async fn complete_with_image(
        &self,
        prompt: &str,
        image: ImageData,
    ) -> Result<String, ChatPdfError>;
}

/// [`ChatModel`] backed by an edgequake-llm provider.
pub struct LlmChatModel {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    extraction_max_tokens: usize,
}

impl LlmChatModel {
    /// Resolve the provider from the config and wrap it.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ChatPdfError> {
        let provider = resolve_provider(config)?;
        Ok(Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            extraction_max_tokens: config.extraction_max_tokens,
        })
    }

    /// Wrap an already-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ServiceConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            extraction_max_tokens: config.extraction_max_tokens,
        }
    }
}

#[async_trait]
impl ChatModel for LlmChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, ChatPdfError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = build_options(self.temperature, self.max_tokens);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ChatPdfError::LlmFailed {
                detail: format!("{e}"),
            })?;

        debug!(
            "completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }

    async fn complete_with_image(
        &self,
        prompt: &str,
        image: ImageData,
    ) -> Result<String, ChatPdfError> {
        // Vision APIs require at least one user turn; the image carries all
        // the actual content, so the user text stays empty.
        let messages = vec![
            ChatMessage::system(prompt),
            ChatMessage::user_with_images("", vec![image]),
        ];
        let options = build_options(self.temperature, self.extraction_max_tokens);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ChatPdfError::LlmFailed {
                detail: format!("{e}"),
            })?;

        debug!(
            "vision completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

/// Build `CompletionOptions` for one call.
fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, ChatPdfError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ChatPdfError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed and
///    configured the provider entirely; we use it as-is. Useful in tests or
///    when the caller needs custom middleware.
///
/// 2. **Named provider + model** (`config.provider_name`) — we call
///    [`ProviderFactory::create_llm_provider`], which reads the corresponding
///    API key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **OpenAI key present** — users with multiple provider keys default to
///    OpenAI unless they explicitly request another provider.
///
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans all known API key variables and picks the first available
///    provider.
pub fn resolve_provider(config: &ServiceConfig) -> Result<Arc<dyn LLMProvider>, ChatPdfError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ChatPdfError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_carries_knobs() {
        let opts = build_options(0.0, 1000);
        assert_eq!(opts.temperature, Some(0.0));
        assert_eq!(opts.max_tokens, Some(1000));
    }

    #[test]
    fn build_options_extraction_budget() {
        let config = ServiceConfig::default();
        let opts = build_options(config.temperature, config.extraction_max_tokens);
        assert_eq!(opts.max_tokens, Some(4096));
    }
}
