//! Page cache: JPEG artifacts plus a completion manifest per document hash.
//!
//! Directory existence alone is not proof of a finished run: a crash between
//! "pages written" and "collection stored" leaves a directory that lies about
//! its own completeness. The manifest is written last, atomically, once the
//! vector collection is on disk. A hash counts as processed only when the
//! manifest parses and its page count matches the `.jpg` files actually
//! present; anything else is reprocessed in place.

use crate::error::ChatPdfError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Manifest filename inside each hash directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Record of a completed processing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Number of page images the run produced.
    pub page_count: usize,
    /// Filename the document was uploaded under.
    pub source_filename: String,
}

/// Completeness of a hash directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// No directory for this hash.
    Missing,
    /// Directory exists but cannot be trusted: manifest absent or unreadable,
    /// or its page count disagrees with the images on disk.
    Incomplete,
    /// Fully processed; holds the cached page-image count.
    Complete(usize),
}

/// Inspect the cache directory for one hash.
pub async fn inspect(dir: &Path) -> CacheStatus {
    match tokio::fs::try_exists(dir).await {
        Ok(true) => {}
        _ => return CacheStatus::Missing,
    }

    let manifest_bytes = match tokio::fs::read(dir.join(MANIFEST_FILE)).await {
        Ok(bytes) => bytes,
        Err(_) => return CacheStatus::Incomplete,
    };
    let manifest: Manifest = match serde_json::from_slice(&manifest_bytes) {
        Ok(m) => m,
        Err(_) => return CacheStatus::Incomplete,
    };

    let images = match count_page_images(dir).await {
        Ok(n) => n,
        Err(_) => return CacheStatus::Incomplete,
    };

    if images > 0 && images == manifest.page_count {
        CacheStatus::Complete(images)
    } else {
        CacheStatus::Incomplete
    }
}

/// Count the `.jpg` page images in a hash directory.
pub async fn count_page_images(dir: &Path) -> Result<usize, std::io::Error> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut count = 0usize;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
            count += 1;
        }
    }
    Ok(count)
}

/// Atomically write the completion manifest into `dir`.
pub async fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<(), ChatPdfError> {
    let path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_vec_pretty(manifest)
        .map_err(|e| ChatPdfError::Internal(format!("manifest serialise: {e}")))?;

    let tmp_path = dir.join(format!("{MANIFEST_FILE}.tmp"));
    tokio::fs::write(&tmp_path, &json)
        .await
        .map_err(|e| ChatPdfError::ArtifactWriteFailed {
            path: tmp_path.clone(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, &path)
        .await
        .map_err(|e| ChatPdfError::ArtifactWriteFailed { path, source: e })?;

    Ok(())
}
