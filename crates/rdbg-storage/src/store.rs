//! Upload store implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Extension used when the original file name has none we can keep.
const DEFAULT_EXTENSION: &str = "mp4";

/// Longest extension carried over from the original file name.
const MAX_EXTENSION_LEN: usize = 10;

/// Suffix for blobs that are still being written.
const PARTIAL_SUFFIX: &str = "part";

/// A stored upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    /// Generated upload id (UUID v4).
    pub file_id: String,
    /// Name of the blob on disk (`<file_id>.<ext>`).
    pub file_name: String,
    /// Absolute or store-relative path of the blob.
    pub path: PathBuf,
    /// Media type used when the blob is sent to the model.
    pub content_type: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Flat-directory blob store with an explicit upload-id index.
///
/// Lookups are exact id matches against the index; the directory is only
/// scanned once, when the store is opened.
#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
    index: Arc<RwLock<HashMap<String, StoredUpload>>>,
}

impl UploadStore {
    /// Open a store rooted at `root`, creating the directory if needed and
    /// indexing blobs left by previous runs.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let mut index = HashMap::new();
        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some((file_id, extension)) = parse_blob_name(&path) else {
                debug!("Skipping non-upload file {}", path.display());
                continue;
            };

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Failed to stat {}: {}", path.display(), e);
                    continue;
                }
            };

            let uploaded_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            index.insert(
                file_id.clone(),
                StoredUpload {
                    file_name: format!("{file_id}.{extension}"),
                    content_type: mime_for_extension(&extension).to_string(),
                    file_id,
                    path,
                    size_bytes: metadata.len(),
                    uploaded_at,
                },
            );
        }

        info!("Opened upload store at {} ({} uploads)", root.display(), index.len());

        Ok(Self {
            root,
            index: Arc::new(RwLock::new(index)),
        })
    }

    /// Number of indexed uploads.
    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Whether the index is empty.
    pub async fn is_empty(&self) -> bool {
        self.index.read().await.is_empty()
    }

    /// Write `data` as a new upload and index it.
    ///
    /// The blob is written under a temporary name and renamed into place, so
    /// an interrupted write never becomes visible.
    pub async fn store(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> StorageResult<StoredUpload> {
        let file_id = Uuid::new_v4().to_string();
        let extension = extension_from_name(original_name);
        let file_name = format!("{file_id}.{extension}");
        let path = self.root.join(&file_name);
        let partial = self.root.join(format!("{file_name}.{PARTIAL_SUFFIX}"));

        debug!("Writing {} bytes to {}", data.len(), path.display());

        tokio::fs::write(&partial, data)
            .await
            .map_err(|e| StorageError::write_failed(format!("{}: {}", partial.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&partial, &path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(StorageError::write_failed(format!("{}: {}", path.display(), e)));
        }

        let content_type = match content_type {
            Some(ct) if ct.starts_with("video/") => ct.to_string(),
            _ => mime_for_extension(&extension).to_string(),
        };

        let upload = StoredUpload {
            file_id: file_id.clone(),
            file_name,
            path,
            content_type,
            size_bytes: data.len() as u64,
            uploaded_at: Utc::now(),
        };

        self.index.write().await.insert(file_id, upload.clone());

        info!(
            file_id = %upload.file_id,
            size_bytes = upload.size_bytes,
            "Stored upload {}", upload.file_name
        );
        Ok(upload)
    }

    /// Look up an upload by its exact id.
    pub async fn lookup(&self, file_id: &str) -> StorageResult<StoredUpload> {
        self.index
            .read()
            .await
            .get(file_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found(file_id))
    }

    /// Read the blob for an upload.
    pub async fn read(&self, upload: &StoredUpload) -> StorageResult<Vec<u8>> {
        match tokio::fs::read(&upload.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Removed from disk behind our back; drop the stale entry.
                warn!(file_id = %upload.file_id, "Indexed upload missing on disk");
                self.index.write().await.remove(&upload.file_id);
                Err(StorageError::not_found(&upload.file_id))
            }
            Err(e) => Err(StorageError::read_failed(format!(
                "{}: {}",
                upload.path.display(),
                e
            ))),
        }
    }

    /// Check that the store directory accepts writes.
    pub async fn check_writable(&self) -> StorageResult<()> {
        let probe = self.root.join(format!(".probe-{}", Uuid::new_v4()));
        tokio::fs::write(&probe, b"ok")
            .await
            .map_err(|e| StorageError::write_failed(e.to_string()))?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }
}

/// Media type for a file extension.
pub fn mime_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "m4v" => "video/x-m4v",
        _ => "video/mp4",
    }
}

/// Sanitized extension of an uploaded file name.
fn extension_from_name(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Split a blob path into `(file_id, extension)` if it names an upload.
fn parse_blob_name(path: &Path) -> Option<(String, String)> {
    let stem = path.file_stem()?.to_str()?;
    let extension = path.extension()?.to_str()?;
    let id = Uuid::parse_str(stem).ok()?;
    Some((id.to_string(), extension.to_ascii_lowercase()))
}
