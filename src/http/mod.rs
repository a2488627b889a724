//! HTTP surface: shared state, router, and the error-to-status mapping.
//!
//! The library stays HTTP-agnostic; this module is the one place where
//! [`ChatPdfError`] variants turn into status codes. Handlers return
//! `Result<Json<_>, ApiError>` and bubble library errors up with `?`, so a
//! new error variant only needs a decision here, not in every handler.
//!
//! State is plain dependency injection: the model, the embedder, the store,
//! and the config are built once at startup and cloned into each request via
//! axum's `State` extractor. Tests swap the trait objects for stubs and drive
//! the router directly, no socket needed.

mod handlers;

pub use handlers::{process_handler, query_handler, root_handler};
pub use handlers::{ProcessResponse, QueryRequest, QueryResponse};

use crate::config::ServiceConfig;
use crate::embed::Embedder;
use crate::error::ChatPdfError;
use crate::llm::ChatModel;
use crate::store::VectorStore;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared per-request dependencies.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub chat: Arc<dyn ChatModel>,
    pub embedder: Arc<dyn Embedder>,
    pub store: VectorStore,
}

impl AppState {
    /// Assemble the state; the vector store is rooted at the configured
    /// directory.
    pub fn new(
        config: ServiceConfig,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        let store = VectorStore::new(&config.store_dir);
        Self {
            config: Arc::new(config),
            chat,
            embedder,
            store,
        }
    }
}

/// Build the service router.
///
/// The body limit guards `/process` uploads; request tracing goes through
/// `tower-http` so every request logs method, path, status, and latency
/// under the `tower_http::trace` target.
pub fn router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(root_handler))
        .route("/process", post(process_handler))
        .route("/query", post(query_handler))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Response-side wrapper for [`ChatPdfError`].
///
/// Exists because `IntoResponse` cannot be implemented for the library error
/// directly without making the whole library depend on axum semantics.
#[derive(Debug)]
pub struct ApiError(pub ChatPdfError);

impl From<ChatPdfError> for ApiError {
    fn from(err: ChatPdfError) -> Self {
        Self(err)
    }
}

/// Status code for each error group: client mistakes are 400, missing
/// documents are 404, everything else is a 500.
fn status_for(err: &ChatPdfError) -> StatusCode {
    use ChatPdfError::*;
    match err {
        MissingFilePart
        | InvalidMultipart { .. }
        | EmptyUpload
        | UnsupportedFileType { .. }
        | NotAPdf { .. } => StatusCode::BAD_REQUEST,

        CollectionNotFound { .. } | NoDocuments { .. } => StatusCode::NOT_FOUND,

        CorruptPdf { .. }
        | RasterisationFailed { .. }
        | ProviderNotConfigured { .. }
        | PageExtractionFailed { .. }
        | LlmFailed { .. }
        | EmbeddingFailed { .. }
        | EmbeddingShape { .. }
        | StoreIo { .. }
        | StoreCorrupt { .. }
        | ArtifactWriteFailed { .. }
        | InvalidConfig(_)
        | PdfiumBindingFailed(_)
        | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        // Server-side failures are our problem and get the loud level;
        // validation and not-found outcomes are routine.
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        } else {
            tracing::debug!("request rejected ({}): {}", status, self.0);
        }
        let body = json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        assert_eq!(
            status_for(&ChatPdfError::UnsupportedFileType {
                filename: "x.txt".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ChatPdfError::MissingFilePart),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&ChatPdfError::NotAPdf { magic: *b"PK\x03\x04" }),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn missing_documents_are_not_found() {
        assert_eq!(
            status_for(&ChatPdfError::CollectionNotFound { hash: "h".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ChatPdfError::NoDocuments { hash: "h".into() }),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn upstream_failures_are_server_errors() {
        assert_eq!(
            status_for(&ChatPdfError::LlmFailed {
                detail: "timeout".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&ChatPdfError::EmbeddingFailed {
                detail: "503".into()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
