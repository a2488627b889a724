//! On-disk vector store: one collection per document hash.
//!
//! ## Why a flat file per collection?
//!
//! A collection holds one entry per PDF page, so even a 500-page document is
//! a few megabytes of JSON. At that scale a brute-force cosine scan over the
//! deserialized entries is faster than any index could pay for itself, and a
//! single file per hash gives atomic replace-on-write for free (write to a
//! temp path, then rename). No daemon, no schema migrations, and `rm -r` is
//! a complete purge tool.
//!
//! Embeddings happen elsewhere ([`crate::embed`]); the store only persists
//! vectors and ranks them.

use crate::error::ChatPdfError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// One stored page record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocEntry {
    /// Entry identifier; the page image filename, e.g. `3.jpg`.
    pub id: String,
    /// Provenance metadata; same filename as `id`.
    pub source: String,
    /// Extracted Markdown for the page.
    pub text: String,
    /// Embedding vector for `text`.
    pub embedding: Vec<f32>,
}

/// One similarity-search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: String,
    pub source: String,
    pub text: String,
    /// Cosine similarity in `[-1, 1]`; higher is closer.
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    entries: Vec<DocEntry>,
}

/// Vector store rooted at a directory; collections are `<root>/<name>.json`.
///
/// Collection names are lowercase hex MD5 digests, the document identity
/// used everywhere in this service. Every operation checks that shape before
/// building a path, so a caller-supplied name can never address a file
/// outside the root.
#[derive(Debug, Clone)]
pub struct VectorStore {
    root: PathBuf,
}

impl VectorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the collection file for `name`.
    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// True if a collection file exists for `name`.
    pub async fn collection_exists(&self, name: &str) -> bool {
        if !is_md5_name(name) {
            return false;
        }
        tokio::fs::try_exists(self.collection_path(name))
            .await
            .unwrap_or(false)
    }

    /// Persist a collection, replacing any previous content atomically.
    ///
    /// # Errors
    /// [`ChatPdfError::Internal`] if `name` is not a lowercase hex digest;
    /// collection names are always computed hashes, so anything else is a
    /// caller bug, not client input.
    pub async fn save_collection(
        &self,
        name: &str,
        entries: Vec<DocEntry>,
    ) -> Result<(), ChatPdfError> {
        if !is_md5_name(name) {
            return Err(ChatPdfError::Internal(format!(
                "invalid collection name '{name}': expected a lowercase hex MD5 digest"
            )));
        }
        let path = self.collection_path(name);
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| store_io(&path, e))?;

        let file = CollectionFile { entries };
        let json = serde_json::to_vec(&file)
            .map_err(|e| ChatPdfError::Internal(format!("collection serialise: {e}")))?;

        // Atomic write: temp file + rename, so readers never see a partial
        // collection and the last concurrent writer wins cleanly.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| store_io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| store_io(&path, e))?;

        Ok(())
    }

    /// Load a collection's entries.
    ///
    /// # Errors
    /// [`ChatPdfError::CollectionNotFound`] if `name` is not a lowercase hex
    /// digest or no file exists for it; [`ChatPdfError::StoreCorrupt`] if the
    /// file does not parse.
    pub async fn load_collection(&self, name: &str) -> Result<Vec<DocEntry>, ChatPdfError> {
        if !is_md5_name(name) {
            return Err(ChatPdfError::CollectionNotFound {
                hash: name.to_string(),
            });
        }
        let path = self.collection_path(name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ChatPdfError::CollectionNotFound {
                    hash: name.to_string(),
                });
            }
            Err(e) => return Err(store_io(&path, e)),
        };

        let file: CollectionFile =
            serde_json::from_slice(&bytes).map_err(|e| ChatPdfError::StoreCorrupt {
                path: path.clone(),
                detail: format!("{e}"),
            })?;
        Ok(file.entries)
    }

    /// Rank a collection's entries against `query` by cosine similarity and
    /// return the best `top_k`, highest score first.
    pub async fn search(
        &self,
        name: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchHit>, ChatPdfError> {
        let entries = self.load_collection(name).await?;

        let mut hits: Vec<SearchHit> = entries
            .into_iter()
            .map(|entry| {
                let score = cosine_similarity(query, &entry.embedding);
                SearchHit {
                    id: entry.id,
                    source: entry.source,
                    text: entry.text,
                    score,
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn store_io(path: &Path, source: std::io::Error) -> ChatPdfError {
    ChatPdfError::StoreIo {
        path: path.to_path_buf(),
        source,
    }
}

/// True when `name` has the one shape a collection name can take: the
/// 32-character lowercase hex MD5 of the document bytes. Anything else never
/// names a collection and must not reach a filesystem path.
fn is_md5_name(name: &str) -> bool {
    name.len() == 32 && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Cosine similarity of two vectors; 0.0 for mismatched or degenerate input.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
