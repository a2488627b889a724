//! # chatpdf
//!
//! Chat-with-PDF backend: upload a PDF, get back a content hash, then ask
//! questions about the document in natural language.
//!
//! ## Why this design?
//!
//! Traditional PDF text extraction (pdftotext, pdf-extract) garbles exactly
//! the documents people want to query — multi-column papers, forms, tables.
//! Instead each page is rasterised and transcribed by a vision LLM, so the
//! stored text reads the way a human reads the page. Per-page records keep
//! retrieval granular: a question pulls back the handful of pages that
//! matter, not the whole document.
//!
//! ## Request Flows
//!
//! ```text
//! POST /process
//!  upload ─▶ validate ─▶ md5 ─▶ cache? ──hit──▶ respond (cached page count)
//!                                │miss
//!                                ├─ render    rasterise pages via pdfium
//!                                ├─ encode    JPEG artifacts + base64
//!                                ├─ extract   vision LLM → Markdown per page
//!                                ├─ embed     one batch embeddings call
//!                                └─ store     per-page records in <hash>.json
//!
//! POST /query
//!  {hash, query} ─▶ keywords (LLM) ──< 3──▶ conversational answer, no search
//!                                │≥ 3
//!                                ├─ embed keyword string
//!                                ├─ cosine top-5 over the hash's collection
//!                                └─ answer from retrieved excerpts (LLM)
//! ```
//!
//! ## Quick Start (library)
//!
//! ```rust,no_run
//! use chatpdf::{AppState, LlmChatModel, OpenAiEmbedder, ServiceConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ServiceConfig::default();
//!     let chat = Arc::new(LlmChatModel::from_config(&config)?);
//!     let embedder = Arc::new(OpenAiEmbedder::from_config(&config)?);
//!
//!     let state = AppState::new(config, chat, embedder);
//!     let app = chatpdf::http::router(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | Enables the `chatpdf-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `server` when embedding the library to avoid pulling in the
//! binary-only deps:
//! ```toml
//! chatpdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Swapping the models
//!
//! Handlers reach the chat model through [`ChatModel`] and the embedding API
//! through [`Embedder`]; both are plain trait objects in [`AppState`]. Tests
//! drop in deterministic stubs, and deployments can point
//! `--embed-base-url` at any OpenAI-compatible server.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod answer;
pub mod cache;
pub mod config;
pub mod embed;
pub mod error;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use answer::{answer_query, QueryOutcome};
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use embed::{Embedder, OpenAiEmbedder};
pub use error::ChatPdfError;
pub use http::{AppState, ProcessResponse, QueryRequest, QueryResponse};
pub use ingest::{process_document, ProcessOutcome};
pub use llm::{ChatModel, LlmChatModel};
pub use store::{DocEntry, SearchHit, VectorStore};
