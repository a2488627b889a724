//! Query answering: the pipeline behind `POST /query`.
//!
//! One call covers the whole flow: ask the model for search keywords, decide
//! whether the query is worth a vector search at all, run the search, and
//! turn the retrieved page excerpts into an answer. The keyword gate exists
//! because greetings and one-word messages embed into meaningless vectors;
//! answering those conversationally is both cheaper and better than searching
//! with noise. Below the gate the embedder and the store are never touched.

use crate::config::ServiceConfig;
use crate::embed::Embedder;
use crate::error::ChatPdfError;
use crate::llm::ChatModel;
use crate::prompts;
use crate::store::VectorStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of answering one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// The query as the client sent it.
    pub query: String,
    /// Keywords parsed from the model's reply, in reply order.
    pub keywords: Vec<String>,
    /// The generated answer.
    pub answer: String,
    /// Number of search hits the answer drew on; 0 for the no-context path.
    pub total_results: usize,
}

/// Answer a query against a processed document.
///
/// # Errors
/// [`ChatPdfError::CollectionNotFound`] / [`ChatPdfError::NoDocuments`] when
/// the hash has nothing to search; upstream variants for LLM or embedding
/// failures.
pub async fn answer_query(
    config: &ServiceConfig,
    chat: &Arc<dyn ChatModel>,
    embedder: &Arc<dyn Embedder>,
    store: &VectorStore,
    hash: &str,
    query: &str,
) -> Result<QueryOutcome, ChatPdfError> {
    // ── Step 1: Extract search keywords ──────────────────────────────────
    let raw_keywords = chat.complete(&prompts::keyword_prompt(query)).await?;
    let keywords = parse_keywords(&raw_keywords);
    debug!("Query yielded {} keywords: {:?}", keywords.len(), keywords);

    // ── Step 2: Keyword gate ─────────────────────────────────────────────
    if keywords.len() < config.min_keywords {
        info!(
            "Only {} keyword(s) extracted (< {}); answering without context",
            keywords.len(),
            config.min_keywords
        );
        let answer = chat.complete(&prompts::fallback_prompt(query)).await?;
        return Ok(QueryOutcome {
            query: query.to_string(),
            keywords,
            answer,
            total_results: 0,
        });
    }

    // ── Step 3: Similarity search ────────────────────────────────────────
    // The raw comma-separated reply is what gets embedded; the parsed list
    // is only for the gate and the response body.
    let query_vector = embedder
        .embed(&[raw_keywords])
        .await?
        .into_iter()
        .next()
        .ok_or(ChatPdfError::EmbeddingShape {
            expected: 1,
            got: 0,
        })?;

    let hits = store.search(hash, &query_vector, config.top_k).await?;
    if hits.is_empty() {
        return Err(ChatPdfError::NoDocuments {
            hash: hash.to_string(),
        });
    }
    debug!("Search over {} returned {} hits", hash, hits.len());

    // ── Step 4: Answer from the retrieved excerpts ───────────────────────
    let excerpts: Vec<String> = hits.iter().map(|h| h.text.clone()).collect();
    let answer = chat
        .complete(&prompts::answer_prompt(query, &excerpts))
        .await?;

    Ok(QueryOutcome {
        query: query.to_string(),
        keywords,
        answer,
        total_results: hits.len(),
    })
}

/// Split the model's keyword reply on commas, trimming whitespace and
/// dropping empty pieces (the reply to a greeting is an empty string, which
/// parses to zero keywords).
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
