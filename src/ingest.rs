//! Upload processing: the pipeline behind `POST /process`.
//!
//! One call takes raw upload bytes all the way to a stored, searchable
//! document: validate, hash, short-circuit on a complete cache entry,
//! rasterise, write page artifacts, transcribe each page, embed the texts in
//! one batch, persist the collection, and finally write the completion
//! manifest. The manifest write comes last on purpose: any earlier failure
//! leaves the hash directory unmarked, so the next upload of the same bytes
//! reprocesses it in place instead of trusting a half-finished run.

use crate::cache::{self, CacheStatus, Manifest};
use crate::config::ServiceConfig;
use crate::embed::Embedder;
use crate::error::ChatPdfError;
use crate::llm::ChatModel;
use crate::pipeline::{encode, extract, render};
use crate::store::{DocEntry, VectorStore};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of processing one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// MD5 hash of the uploaded bytes; the document's identity.
    pub hash: String,
    /// Number of page images for the document.
    pub total_pages: usize,
    /// True when a complete cache entry short-circuited the pipeline.
    pub already_processed: bool,
}

/// Process an uploaded PDF into page artifacts and a vector collection.
pub async fn process_document(
    config: &ServiceConfig,
    chat: &Arc<dyn ChatModel>,
    embedder: &Arc<dyn Embedder>,
    store: &VectorStore,
    filename: &str,
    bytes: &[u8],
) -> Result<ProcessOutcome, ChatPdfError> {
    // ── Step 1: Validate the upload ──────────────────────────────────────
    validate_filename(filename)?;
    validate_pdf_bytes(bytes)?;

    // ── Step 2: Compute the document identity ────────────────────────────
    let hash = content_hash(bytes);
    let page_dir = config.pages_dir.join(&hash);
    debug!("Upload '{}' hashed to {}", filename, hash);

    // ── Step 3: Cache short-circuit ───────────────────────────────────────
    if let CacheStatus::Complete(pages) = cache::inspect(&page_dir).await {
        info!("Document {} already processed ({} pages)", hash, pages);
        return Ok(ProcessOutcome {
            hash,
            total_pages: pages,
            already_processed: true,
        });
    }

    // ── Step 4: Persist the upload for pdfium ────────────────────────────
    // pdfium wants a file path. The NamedTempFile guard removes the upload
    // on every exit path, success or failure.
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| ChatPdfError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ChatPdfError::Internal(format!("tempfile write: {e}")))?;

    // ── Step 5: Rasterise every page ──────────────────────────────────────
    let images = render::render_pages(tmp.path(), config.max_rendered_pixels).await?;
    let total_pages = images.len();
    if total_pages == 0 {
        return Err(ChatPdfError::CorruptPdf {
            detail: "document has no pages".to_string(),
        });
    }
    info!("Rendered {} pages for {}", total_pages, hash);

    // ── Step 6: Write artifacts and transcribe, in page order ────────────
    tokio::fs::create_dir_all(&page_dir)
        .await
        .map_err(|e| ChatPdfError::ArtifactWriteFailed {
            path: page_dir.clone(),
            source: e,
        })?;

    let mut texts = Vec::with_capacity(total_pages);
    for (idx, image) in images.iter().enumerate() {
        let jpeg = encode::encode_jpeg(image).map_err(|e| ChatPdfError::RasterisationFailed {
            page: idx + 1,
            detail: format!("JPEG encoding failed: {e}"),
        })?;

        let artifact = page_dir.join(format!("{idx}.jpg"));
        tokio::fs::write(&artifact, &jpeg)
            .await
            .map_err(|e| ChatPdfError::ArtifactWriteFailed {
                path: artifact,
                source: e,
            })?;

        let markdown =
            extract::page_to_markdown(chat, idx + 1, encode::to_image_data(&jpeg), config).await?;
        texts.push(markdown);
    }

    // ── Step 7: Embed all page texts in one batch ─────────────────────────
    let vectors = embedder.embed(&texts).await?;

    // ── Step 8: Store the collection under the hash ──────────────────────
    let entries: Vec<DocEntry> = texts
        .into_iter()
        .zip(vectors)
        .enumerate()
        .map(|(idx, (text, embedding))| DocEntry {
            id: format!("{idx}.jpg"),
            source: format!("{idx}.jpg"),
            text,
            embedding,
        })
        .collect();
    store.save_collection(&hash, entries).await?;

    // ── Step 9: Mark the cache entry complete ─────────────────────────────
    let manifest = Manifest {
        page_count: total_pages,
        source_filename: filename.to_string(),
    };
    cache::write_manifest(&page_dir, &manifest).await?;

    info!("Document {} processed: {} pages stored", hash, total_pages);
    Ok(ProcessOutcome {
        hash,
        total_pages,
        already_processed: false,
    })
}

/// Reject filenames that do not end in `.pdf` (case-insensitive).
pub fn validate_filename(filename: &str) -> Result<(), ChatPdfError> {
    let is_pdf = Path::new(filename)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if is_pdf {
        Ok(())
    } else {
        Err(ChatPdfError::UnsupportedFileType {
            filename: filename.to_string(),
        })
    }
}

/// Reject empty uploads and byte streams that are not PDFs.
pub fn validate_pdf_bytes(bytes: &[u8]) -> Result<(), ChatPdfError> {
    if bytes.is_empty() {
        return Err(ChatPdfError::EmptyUpload);
    }
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(ChatPdfError::NotAPdf { magic });
    }
    Ok(())
}

/// MD5 of the raw bytes, lowercase hex. Identical bytes always map to the
/// same hash, which names both the cache directory and the collection.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", md5::compute(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_must_end_in_pdf() {
        assert!(validate_filename("report.pdf").is_ok());
        assert!(validate_filename("REPORT.PDF").is_ok());
        assert!(validate_filename("archive.tar.pdf").is_ok());

        assert!(matches!(
            validate_filename("notes.txt").unwrap_err(),
            ChatPdfError::UnsupportedFileType { .. }
        ));
        assert!(validate_filename("pdf").is_err());
        assert!(validate_filename("").is_err());
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(matches!(
            validate_pdf_bytes(b"").unwrap_err(),
            ChatPdfError::EmptyUpload
        ));
    }

    #[test]
    fn non_pdf_magic_is_rejected() {
        let err = validate_pdf_bytes(b"PK\x03\x04rest").unwrap_err();
        match err {
            ChatPdfError::NotAPdf { magic } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(validate_pdf_bytes(b"%P").is_err());
    }

    #[test]
    fn pdf_magic_is_accepted() {
        assert!(validate_pdf_bytes(b"%PDF-1.7\n...").is_ok());
    }

    #[test]
    fn hash_is_md5_lowercase_hex() {
        // Well-known digest of "hello".
        assert_eq!(content_hash(b"hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn hash_is_deterministic_and_content_sensitive() {
        let a = content_hash(b"%PDF-1.7 sample");
        let b = content_hash(b"%PDF-1.7 sample");
        let c = content_hash(b"%PDF-1.7 other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
