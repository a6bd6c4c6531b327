//! Uploaded SQLite file storage.
//!
//! Files land in one shared directory under a timestamp-prefixed name so
//! concurrent uploads of the same file name cannot collide. Only SQLite
//! extensions are accepted; anything else is rejected before a byte is
//! written.

use std::path::PathBuf;

use serde::Serialize;
use utoipa::ToSchema;

use common::errors::{AppError, AppResult};
use common::utils::file_name::{has_allowed_extension, timestamped, ALLOWED_EXTENSIONS};

/// A stored upload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UploadedFile {
    /// Stored (timestamp-prefixed) file name.
    pub file_name: String,
    /// Full path on the server, usable as a SQLite `file_path`.
    pub file_path: String,
    /// File size in bytes.
    pub size: u64,
}

/// Directory-backed store for uploaded database files.
#[derive(Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Ensures the upload directory exists.
    pub async fn ensure_dir(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("failed to create upload dir: {e}")))
    }

    /// Validates the extension and writes the upload to disk.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> AppResult<UploadedFile> {
        if !has_allowed_extension(original_name) {
            return Err(AppError::Validation(format!(
                "unsupported file extension; allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let stored = timestamped(original_name);
        let path = self.dir.join(&stored);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("failed to write upload: {e}")))?;

        tracing::info!(file = %stored, size = bytes.len(), "file uploaded");
        Ok(UploadedFile {
            file_name: stored,
            file_path: path.to_string_lossy().into_owned(),
            size: bytes.len() as u64,
        })
    }

    /// Lists stored database files.
    pub async fn list(&self) -> AppResult<Vec<UploadedFile>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // Nothing uploaded yet.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(AppError::Internal(format!("failed to read upload dir: {e}"))),
        };

        let mut files = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !has_allowed_extension(&name) {
                continue;
            }
            let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
            files.push(UploadedFile {
                file_path: entry.path().to_string_lossy().into_owned(),
                file_name: name,
                size,
            });
        }
        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FileStore {
        let dir = std::env::temp_dir().join(format!("workbench-uploads-{}", uuid::Uuid::new_v4()));
        FileStore::new(dir)
    }

    #[tokio::test]
    async fn rejected_extension_writes_nothing() {
        let store = temp_store();
        store.ensure_dir().await.unwrap();

        let err = store.save("test.exe", b"MZ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sqlite_upload_is_stored_under_new_name() {
        let store = temp_store();
        store.ensure_dir().await.unwrap();

        let saved = store.save("test.sqlite", b"SQLite format 3\0").await.unwrap();
        assert_ne!(saved.file_name, "test.sqlite");
        assert!(saved.file_name.ends_with("-test.sqlite"));
        assert_eq!(saved.size, 16);

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_name, saved.file_name);
    }

    #[tokio::test]
    async fn list_before_any_upload_is_empty() {
        let store = temp_store();
        assert!(store.list().await.unwrap().is_empty());
    }
}
