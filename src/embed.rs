//! Embeddings: the [`Embedder`] seam and an OpenAI-compatible client.
//!
//! Page texts and query keywords are embedded through the same trait so tests
//! can substitute a deterministic embedder and the similarity-search property
//! "no keywords ⇒ no embedding call" stays observable. The production
//! implementation talks to any OpenAI-compatible `/embeddings` endpoint
//! (api.openai.com or a self-hosted server), batching all inputs into one
//! request.

use crate::config::ServiceConfig;
use crate::error::ChatPdfError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// The service's view of an embedding model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed every input, returning one vector per input in the same order.
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatPdfError>;
}

/// [`Embedder`] backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    /// Build the client from the config, reading the API key from
    /// `OPENAI_API_KEY`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ChatPdfError> {
        let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()).ok_or(
            ChatPdfError::ProviderNotConfigured {
                provider: "openai-embeddings".to_string(),
                hint: "Set OPENAI_API_KEY, or point --embed-base-url at a server that needs no key."
                    .to_string(),
            },
        )?;
        Self::new(&config.embed_base_url, api_key, &config.embed_model, config.api_timeout_secs)
    }

    /// Build the client with explicit parameters.
    pub fn new(
        base_url: &str,
        api_key: String,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, ChatPdfError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChatPdfError::Internal(format!("embeddings HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingUsage {
    prompt_tokens: u64,
    total_tokens: u64,
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ChatPdfError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatPdfError::EmbeddingFailed {
                detail: format!("{e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatPdfError::EmbeddingFailed {
                detail: format!("HTTP {status}: {body}"),
            });
        }

        let mut body: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| ChatPdfError::EmbeddingFailed {
                    detail: format!("response decode: {e}"),
                })?;

        if let Some(usage) = &body.usage {
            debug!(
                "embedded {} inputs: {} prompt tokens, {} total",
                inputs.len(),
                usage.prompt_tokens,
                usage.total_tokens
            );
        }

        // The API is free to reorder `data`; `index` is authoritative.
        body.data.sort_by_key(|d| d.index);
        if body.data.len() != inputs.len() {
            return Err(ChatPdfError::EmbeddingShape {
                expected: inputs.len(),
                got: body.data.len(),
            });
        }

        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }
}
