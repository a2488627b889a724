//! Pipeline stages for turning an uploaded PDF into stored page records.
//!
//! Each submodule implements exactly one transformation step. Keeping stages
//! separate makes each independently testable and lets us swap an
//! implementation (e.g. the rendering backend) without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ render ──▶ encode ──▶ extract ──▶ postprocess
//! (bytes)    (pdfium)   (JPEG+b64)  (vision LLM)  (cleanup)
//! ```
//!
//! 1. [`render`]  — rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 2. [`encode`]  — JPEG-encode each page (the bytes double as the on-disk
//!    cache artifact) and base64-wrap them for the multimodal request body
//! 3. [`extract`] — drive the vision call with retry/backoff; the only stage
//!    with network I/O
//! 4. [`postprocess`] — deterministic text-cleanup rules to fix VLM quirks
//!    (markdown fences, invented image links, stray control characters)
//!
//! Orchestration lives in [`crate::ingest`]; these stages know nothing about
//! hashes, caching, or the vector store.

pub mod encode;
pub mod extract;
pub mod postprocess;
pub mod render;
