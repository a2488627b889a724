//! HTTP server binary for chatpdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, constructs the LLM provider and embedder, and serves
//! the router until ctrl-c or SIGTERM.

use anyhow::{Context, Result};
use chatpdf::{AppState, LlmChatModel, OpenAiEmbedder, ServiceConfig};
use clap::Parser;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  POST /process   multipart upload, field `file`  → {message, hash, total_pages}
  POST /query     {"hash": "...", "query": "..."} → {query, keywords, answer, total_results}
  GET  /          service description

EXAMPLES:
  # Start with defaults (0.0.0.0:8000, ./temp, ./vector_store)
  chatpdf-server

  # Bind locally and keep state under /var/lib/chatpdf
  chatpdf-server --bind 127.0.0.1:9000 \
      --pages-dir /var/lib/chatpdf/pages --store-dir /var/lib/chatpdf/store

  # Pin provider and model
  chatpdf-server --provider openai --model gpt-4o

  # Self-hosted embeddings (any OpenAI-compatible /embeddings endpoint)
  chatpdf-server --embed-base-url http://localhost:8081/v1 --embed-model bge-small

  # Upload a document, then ask about it
  curl -F file=@paper.pdf http://localhost:8000/process
  curl -H 'Content-Type: application/json' \
      -d '{"hash": "<hash from /process>", "query": "What does section 3 conclude?"}' \
      http://localhost:8000/query

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key (chat + embeddings)
  ANTHROPIC_API_KEY       Anthropic API key (chat; embeddings stay OpenAI-compatible)
  GEMINI_API_KEY          Google Gemini API key (chat)
  RUST_LOG                Tracing filter, e.g. RUST_LOG=chatpdf=debug

SETUP:
  1. Set an API key:   export OPENAI_API_KEY=sk-...
  2. Provide pdfium:   place libpdfium next to the binary, or install it
                       system-wide (https://github.com/bblanchon/pdfium-binaries/releases)
  3. Start:            chatpdf-server
"#;

/// Chat-with-PDF backend: process PDFs into a vector store and query them.
#[derive(Parser, Debug)]
#[command(
    name = "chatpdf-server",
    version,
    about = "Chat-with-PDF backend: process PDFs into a vector store and query them",
    long_about = "HTTP service that rasterises uploaded PDFs, transcribes each page to Markdown \
with a vision LLM, embeds the text into an on-disk vector store, and answers natural-language \
questions against the stored content.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "CHATPDF_BIND", default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Directory for cached page images (one subdirectory per document hash).
    #[arg(long, env = "CHATPDF_PAGES_DIR", default_value = "temp")]
    pages_dir: PathBuf,

    /// Directory for vector-store collections (one JSON file per hash).
    #[arg(long, env = "CHATPDF_STORE_DIR", default_value = "vector_store")]
    store_dir: PathBuf,

    /// Chat model ID (e.g. gpt-4o). Defaults to the provider's vision-capable model.
    #[arg(long, env = "CHATPDF_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    /// Auto-detected from API key env vars if not set.
    #[arg(long, env = "CHATPDF_PROVIDER")]
    provider: Option<String>,

    /// Embedding model ID.
    #[arg(long, env = "CHATPDF_EMBED_MODEL", default_value = "text-embedding-3-small")]
    embed_model: String,

    /// Base URL of the OpenAI-compatible embeddings API.
    #[arg(long, env = "CHATPDF_EMBED_BASE_URL", default_value = "https://api.openai.com/v1")]
    embed_base_url: String,

    /// Sampling temperature for all LLM calls (0.0–2.0).
    #[arg(long, env = "CHATPDF_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max tokens for keyword and answer completions.
    #[arg(long, env = "CHATPDF_MAX_TOKENS", default_value_t = 1000)]
    max_tokens: usize,

    /// Max tokens the vision model may generate per page transcription.
    #[arg(long, env = "CHATPDF_EXTRACTION_MAX_TOKENS", default_value_t = 4096)]
    extraction_max_tokens: usize,

    /// Retries per page when a transcription call fails.
    #[arg(long, env = "CHATPDF_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Initial retry delay in milliseconds (doubles per attempt).
    #[arg(long, env = "CHATPDF_RETRY_BACKOFF_MS", default_value_t = 500)]
    retry_backoff_ms: u64,

    /// Similarity-search results per query.
    #[arg(long, env = "CHATPDF_TOP_K", default_value_t = 5)]
    top_k: usize,

    /// Minimum extracted-keyword count required to run a vector search.
    #[arg(long, env = "CHATPDF_MIN_KEYWORDS", default_value_t = 3)]
    min_keywords: usize,

    /// Maximum rendered page dimension in pixels.
    #[arg(long, env = "CHATPDF_MAX_RENDERED_PIXELS", default_value_t = 2000)]
    max_rendered_pixels: u32,

    /// Maximum accepted upload size in MiB.
    #[arg(long, env = "CHATPDF_MAX_UPLOAD_MIB", default_value_t = 50)]
    max_upload_mib: usize,

    /// Per-call timeout for the embeddings API in seconds.
    #[arg(long, env = "CHATPDF_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Path to a text file containing a custom page-transcription prompt.
    #[arg(long, env = "CHATPDF_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CHATPDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CHATPDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config and dependencies ────────────────────────────────────
    let config = build_config(&cli).await?;

    let chat = LlmChatModel::from_config(&config)
        .context("Failed to initialise the LLM provider (is an API key set?)")?;
    let embedder = OpenAiEmbedder::from_config(&config)
        .context("Failed to initialise the embeddings client")?;

    let bind_addr = config.bind_addr;
    let pages_dir = config.pages_dir.clone();
    let store_dir = config.store_dir.clone();
    let state = AppState::new(config, Arc::new(chat), Arc::new(embedder));
    let app = chatpdf::http::router(state);

    // ── Serve ────────────────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| {
            format!(
                "Failed to bind {bind_addr}. Ensure no other process is using port {} \
                 or pass a different --bind address",
                bind_addr.port()
            )
        })?;
    let actual_addr = listener
        .local_addr()
        .context("Failed to read the bound address")?;

    tracing::info!("chatpdf-server listening on http://{actual_addr}");
    tracing::info!("├ pages dir:  {}", pages_dir.display());
    tracing::info!("├ store dir:  {}", store_dir.display());
    tracing::info!(
        "└ model:      {} / embeddings: {}",
        cli.model.as_deref().unwrap_or("provider default"),
        cli.embed_model
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("chatpdf-server stopped");
    Ok(())
}

/// Map CLI args to `ServiceConfig`.
async fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut builder = ServiceConfig::builder()
        .bind_addr(cli.bind)
        .pages_dir(&cli.pages_dir)
        .store_dir(&cli.store_dir)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .extraction_max_tokens(cli.extraction_max_tokens)
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .top_k(cli.top_k)
        .min_keywords(cli.min_keywords)
        .max_rendered_pixels(cli.max_rendered_pixels)
        .max_upload_bytes(cli.max_upload_mib * 1024 * 1024)
        .embed_model(&cli.embed_model)
        .embed_base_url(&cli.embed_base_url)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {path:?}"))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// Resolve on ctrl-c or SIGTERM so in-flight requests drain before exit.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received ctrl-c, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
