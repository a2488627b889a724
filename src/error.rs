//! Error types for the chatpdf library.
//!
//! Every operation returns [`ChatPdfError`]. Variants are grouped by where
//! they arise (upload validation, rendering, LLM calls, embeddings, the
//! vector store, the page cache) so callers can distinguish a client mistake
//! from a transient upstream failure from a terminal internal one. The HTTP
//! layer maps these groups onto status codes in exactly one place
//! ([`crate::http`]); the library itself never speaks HTTP.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the chatpdf library.
#[derive(Debug, Error)]
pub enum ChatPdfError {
    // ── Upload validation ─────────────────────────────────────────────────
    /// The multipart body did not contain a `file` part.
    #[error("Upload is missing the 'file' part.\nSend multipart/form-data with the PDF under the field name 'file'.")]
    MissingFilePart,

    /// The multipart body could not be decoded.
    #[error("Malformed multipart upload: {detail}")]
    InvalidMultipart { detail: String },

    /// The uploaded file part contained zero bytes.
    #[error("Uploaded file is empty")]
    EmptyUpload,

    /// The uploaded filename does not end in `.pdf`.
    #[error("Only PDF files are allowed: got '{filename}'\nUpload a file whose name ends in .pdf.")]
    UnsupportedFileType { filename: String },

    /// The upload was named `.pdf` but the bytes are not a PDF.
    #[error("Uploaded file is not a valid PDF.\nFirst bytes: {magic:?}")]
    NotAPdf { magic: [u8; 4] },

    // ── PDF / render errors ───────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt and cannot be opened: {detail}")]
    CorruptPdf { detail: String },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Markdown extraction for one page failed after all retries.
    #[error("Markdown extraction failed for page {page} after {retries} retries: {detail}")]
    PageExtractionFailed {
        page: usize,
        retries: u32,
        detail: String,
    },

    /// A keyword or answer completion failed.
    #[error("LLM completion failed: {detail}")]
    LlmFailed { detail: String },

    // ── Embedding errors ──────────────────────────────────────────────────
    /// The embeddings API call failed (network, auth, or server error).
    #[error("Embedding request failed: {detail}")]
    EmbeddingFailed { detail: String },

    /// The embeddings API returned the wrong number of vectors.
    #[error("Embedding response shape mismatch: sent {expected} inputs, got {got} vectors")]
    EmbeddingShape { expected: usize, got: usize },

    // ── Vector store errors ───────────────────────────────────────────────
    /// No collection exists for the requested hash.
    #[error("No documents found for the given hash '{hash}'\nProcess the PDF first via POST /process.")]
    CollectionNotFound { hash: String },

    /// The collection exists but the search returned zero hits.
    #[error("No documents found for the given hash '{hash}' (search returned no matches)")]
    NoDocuments { hash: String },

    /// Reading or writing a collection file failed.
    #[error("Vector store I/O failed for '{path}': {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A collection file exists but does not parse.
    #[error("Vector store collection '{path}' is corrupt: {detail}\nDelete the file and re-process the PDF.")]
    StoreCorrupt { path: PathBuf, detail: String },

    // ── Page cache errors ─────────────────────────────────────────────────
    /// Could not write a page image or the completion manifest.
    #[error("Failed to write page artifact '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the server binary, or install it system-wide.\n\
Prebuilt binaries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_file_type_display() {
        let e = ChatPdfError::UnsupportedFileType {
            filename: "notes.txt".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Only PDF files are allowed"), "got: {msg}");
        assert!(msg.contains("notes.txt"));
    }

    #[test]
    fn collection_not_found_display() {
        let e = ChatPdfError::CollectionNotFound {
            hash: "d41d8cd98f00b204e9800998ecf8427e".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("No documents found for the given hash"));
        assert!(msg.contains("d41d8cd9"));
    }

    #[test]
    fn page_extraction_display() {
        let e = ChatPdfError::PageExtractionFailed {
            page: 3,
            retries: 2,
            detail: "rate limited".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 3"));
        assert!(msg.contains("2 retries"));
        assert!(msg.contains("rate limited"));
    }

    #[test]
    fn embedding_shape_display() {
        let e = ChatPdfError::EmbeddingShape {
            expected: 10,
            got: 9,
        };
        assert!(e.to_string().contains("10 inputs"));
        assert!(e.to_string().contains("9 vectors"));
    }

    #[test]
    fn not_a_pdf_display() {
        let e = ChatPdfError::NotAPdf {
            magic: [0x50, 0x4b, 0x03, 0x04],
        };
        assert!(e.to_string().contains("not a valid PDF"));
    }
}
