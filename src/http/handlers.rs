//! Request handlers for the three routes.
//!
//! Handlers stay thin: decode the request, call the library operation, shape
//! the response. Everything with failure modes lives in [`crate::ingest`]
//! and [`crate::answer`], so each handler body is a straight line.

use super::{ApiError, AppState};
use crate::answer;
use crate::error::ChatPdfError;
use crate::ingest;
use axum::extract::{Multipart, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

/// `message` when a complete cache entry short-circuited processing.
const MSG_ALREADY_PROCESSED: &str = "PDF already processed";
/// `message` after a full processing run.
const MSG_PROCESSED: &str = "PDF processed successfully and stored in vector database";

/// Response body for `POST /process`.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub message: String,
    pub hash: String,
    pub total_pages: usize,
}

/// Request body for `POST /query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub hash: String,
    pub query: String,
}

/// Response body for `POST /query`.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub keywords: Vec<String>,
    pub answer: String,
    pub total_results: usize,
}

/// `GET /` — static service description.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Chat with PDF API",
        "endpoints": {
            "POST /process": "Upload and process a PDF file",
            "POST /query": "Query processed PDF using hash and query string"
        }
    }))
}

/// `POST /process` — multipart upload of one PDF under the field `file`.
pub async fn process_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let (filename, bytes) = read_file_part(&mut multipart).await?;
    info!("Processing upload '{}' ({} bytes)", filename, bytes.len());

    let outcome = ingest::process_document(
        &state.config,
        &state.chat,
        &state.embedder,
        &state.store,
        &filename,
        &bytes,
    )
    .await?;

    let message = if outcome.already_processed {
        MSG_ALREADY_PROCESSED
    } else {
        MSG_PROCESSED
    };
    Ok(Json(ProcessResponse {
        message: message.to_string(),
        hash: outcome.hash,
        total_pages: outcome.total_pages,
    }))
}

/// `POST /query` — answer a question against a processed document.
pub async fn query_handler(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    info!("Query against {}: '{}'", request.hash, request.query);

    let outcome = answer::answer_query(
        &state.config,
        &state.chat,
        &state.embedder,
        &state.store,
        &request.hash,
        &request.query,
    )
    .await?;

    Ok(Json(QueryResponse {
        query: outcome.query,
        keywords: outcome.keywords,
        answer: outcome.answer,
        total_results: outcome.total_results,
    }))
}

/// Pull the `file` part out of the multipart body.
///
/// Other parts are drained and ignored so clients that send extra fields
/// (some HTTP libraries add a trailing `submit` part) still work.
async fn read_file_part(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ChatPdfError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ChatPdfError::InvalidMultipart {
            detail: e.to_string(),
        })?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ChatPdfError::InvalidMultipart {
                detail: e.to_string(),
            })?;
        file = Some((filename, bytes.to_vec()));
    }

    file.ok_or(ChatPdfError::MissingFilePart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_payload_describes_both_endpoints() {
        let Json(body) = root_handler().await;
        assert_eq!(body["message"], "Chat with PDF API");
        assert_eq!(
            body["endpoints"]["POST /process"],
            "Upload and process a PDF file"
        );
        assert_eq!(
            body["endpoints"]["POST /query"],
            "Query processed PDF using hash and query string"
        );
    }

    #[test]
    fn query_request_deserialises() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"hash": "abc", "query": "what is this?"}"#).unwrap();
        assert_eq!(req.hash, "abc");
        assert_eq!(req.query, "what is this?");
    }

    #[test]
    fn query_response_keywords_serialise_as_list() {
        let resp = QueryResponse {
            query: "q".into(),
            keywords: vec!["a".into(), "b".into()],
            answer: "ans".into(),
            total_results: 2,
        };
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["keywords"], json!(["a", "b"]));
        assert_eq!(v["total_results"], 2);
    }
}
