//! Markdown extraction: one vision call per page, with retry.
//!
//! This stage is intentionally thin. Prompt text lives in [`crate::prompts`]
//! and the provider behind [`crate::llm::ChatModel`], so this module owns
//! nothing but the retry loop and the cleanup hand-off.
//!
//! ## Retry strategy
//!
//! HTTP 429 / 503 responses from vision APIs are transient and frequent.
//! Exponential backoff (`retry_backoff_ms * 2^attempt`) avoids hammering a
//! recovering endpoint: with the 500 ms default and 3 retries the wait
//! sequence is 500 ms → 1 s → 2 s. Unlike a batch converter, a failed page
//! here fails the whole upload once retries are exhausted; a stored document
//! with silently missing pages would answer queries wrongly.

use crate::config::ServiceConfig;
use crate::error::ChatPdfError;
use crate::llm::ChatModel;
use crate::pipeline::postprocess;
use crate::prompts::DEFAULT_EXTRACTION_PROMPT;
use edgequake_llm::ImageData;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Transcribe a single page image to cleaned Markdown.
///
/// `page_num` is 1-based and appears in logs and errors; the stored record
/// ids stay 0-based to match the artifact filenames.
pub async fn page_to_markdown(
    chat: &Arc<dyn ChatModel>,
    page_num: usize,
    image: ImageData,
    config: &ServiceConfig,
) -> Result<String, ChatPdfError> {
    let prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_EXTRACTION_PROMPT);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Page {}: retry {}/{} after {}ms",
                page_num, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match chat.complete_with_image(prompt, image.clone()).await {
            Ok(markdown) => {
                debug!("Page {}: extracted {} chars", page_num, markdown.len());
                return Ok(postprocess::clean_markdown(&markdown));
            }
            Err(e) => {
                warn!("Page {}: attempt {} failed: {}", page_num, attempt + 1, e);
                last_err = Some(format!("{e}"));
            }
        }
    }

    Err(ChatPdfError::PageExtractionFailed {
        page: page_num,
        retries: config.max_retries,
        detail: last_err.unwrap_or_else(|| "unknown error".to_string()),
    })
}
