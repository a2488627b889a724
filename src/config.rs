//! Configuration for the chat-with-PDF service.
//!
//! Every knob lives in [`ServiceConfig`], built via its
//! [`ServiceConfigBuilder`]. Keeping the whole surface in one struct makes it
//! trivial to share across handlers behind an `Arc`, log it at startup, and
//! diff two deployments to understand why their behaviour differs.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::ChatPdfError;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the service and its processing pipeline.
///
/// Built via [`ServiceConfig::builder()`] or using
/// [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use chatpdf::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .model("gpt-4o")
///     .top_k(5)
///     .pages_dir("temp")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to. Default: `0.0.0.0:8000`.
    pub bind_addr: SocketAddr,

    /// Root directory for cached page images, one subdirectory per document
    /// hash. Default: `temp`.
    ///
    /// Layout: `<pages_dir>/<hash>/<index>.jpg` plus a `manifest.json` written
    /// after the document's collection is stored. The manifest is what marks a
    /// directory as complete; a directory without one is reprocessed.
    pub pages_dir: PathBuf,

    /// Root directory for vector-store collections, one JSON file per
    /// document hash. Default: `vector_store`.
    pub store_dir: PathBuf,

    /// Maximum rendered page dimension (width or height) in pixels. Default: 2000.
    ///
    /// A 13 000 × 18 000 px render of a poster-sized page would exhaust memory
    /// and blow past vision-API upload limits. This caps either dimension,
    /// scaling the other proportionally, so pdfium never allocates more than
    /// roughly `max_rendered_pixels²` bytes of pixels per page.
    pub max_rendered_pixels: u32,

    /// LLM model identifier, e.g. "gpt-4o". If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, resolution falls back to the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for all LLM calls. Default: 0.0.
    ///
    /// Zero keeps keyword extraction and page transcription deterministic and
    /// faithful to the input. Raise it only if answers read too stiffly.
    pub temperature: f32,

    /// Maximum tokens for keyword and answer completions. Default: 1000.
    pub max_tokens: usize,

    /// Maximum tokens the VLM may generate per page transcription. Default: 4096.
    ///
    /// Dense pages (tables, code listings) can exceed 2 000 output tokens.
    /// Setting this too low silently truncates the Markdown mid-sentence, and
    /// the truncated text is what gets embedded and searched.
    pub extraction_max_tokens: usize,

    /// Maximum retry attempts when a page transcription fails. Default: 3.
    ///
    /// Most 5xx and timeout errors are transient. Keyword and answer calls are
    /// not retried; they fail the query immediately.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Number of similarity-search results per query. Default: 5.
    pub top_k: usize,

    /// Minimum extracted-keyword count required to run a vector search.
    /// Default: 3. Below this the query is answered without context.
    pub min_keywords: usize,

    /// Embedding model identifier. Default: `text-embedding-3-small`.
    pub embed_model: String,

    /// Base URL of the OpenAI-compatible embeddings API.
    /// Default: `https://api.openai.com/v1`.
    pub embed_base_url: String,

    /// Per-upstream-call timeout in seconds (embeddings client). Default: 60.
    pub api_timeout_secs: u64,

    /// Maximum accepted upload size in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Custom page-transcription prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            pages_dir: PathBuf::from("temp"),
            store_dir: PathBuf::from("vector_store"),
            max_rendered_pixels: 2000,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 1000,
            extraction_max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            top_k: 5,
            min_keywords: 3,
            embed_model: "text-embedding-3-small".to_string(),
            embed_base_url: "https://api.openai.com/v1".to_string(),
            api_timeout_secs: 60,
            max_upload_bytes: 50 * 1024 * 1024,
            system_prompt: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_addr", &self.bind_addr)
            .field("pages_dir", &self.pages_dir)
            .field("store_dir", &self.store_dir)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("extraction_max_tokens", &self.extraction_max_tokens)
            .field("max_retries", &self.max_retries)
            .field("top_k", &self.top_k)
            .field("min_keywords", &self.min_keywords)
            .field("embed_model", &self.embed_model)
            .field("embed_base_url", &self.embed_base_url)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.config.bind_addr = addr;
        self
    }

    pub fn pages_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.pages_dir = dir.into();
        self
    }

    pub fn store_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.store_dir = dir.into();
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn extraction_max_tokens(mut self, n: usize) -> Self {
        self.config.extraction_max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k.max(1);
        self
    }

    pub fn min_keywords(mut self, n: usize) -> Self {
        self.config.min_keywords = n.max(1);
        self
    }

    pub fn embed_model(mut self, model: impl Into<String>) -> Self {
        self.config.embed_model = model.into();
        self
    }

    pub fn embed_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.embed_base_url = url.into();
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ChatPdfError> {
        let c = &self.config;
        if c.max_tokens == 0 || c.extraction_max_tokens == 0 {
            return Err(ChatPdfError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.pages_dir == c.store_dir {
            return Err(ChatPdfError::InvalidConfig(format!(
                "pages_dir and store_dir must differ, both are '{}'",
                c.pages_dir.display()
            )));
        }
        if c.embed_model.is_empty() {
            return Err(ChatPdfError::InvalidConfig(
                "embed_model must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
