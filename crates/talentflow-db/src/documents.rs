//! Filesystem storage for uploaded candidate documents.
//!
//! Documents (CVs, project reports) are written under a base directory
//! using a two-level fan-out derived from the sha-256 content hash, so a
//! single directory never accumulates an unbounded number of entries and
//! identical uploads land next to each other.

use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use talentflow_core::{new_v7, DocumentStore, Error, Result};

/// Compute the SHA-256 content hash of a document.
///
/// Format: `sha256:{hex}`.
pub fn compute_content_hash(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("sha256:{}", hex::encode(hash))
}

/// Generate a storage path from a content hash, document UUID, and
/// original filename.
///
/// Path format: `docs/{hash[0..2]}/{hash[2..4]}/{uuid}.{ext}` where the
/// prefix directories come from the sha-256 content hash.
///
/// Example: `docs/2c/f2/01948f7e-8b2a-7c3d-9e4f-5a6b7c8d9e0f.pdf`
pub fn generate_storage_path(content_hash: &str, id: &Uuid, original_name: &str) -> String {
    let hex = content_hash
        .strip_prefix("sha256:")
        .unwrap_or(content_hash);
    let ext = std::path::Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    format!(
        "docs/{}/{}/{}.{}",
        &hex[0..2],
        &hex[2..4],
        id.as_hyphenated(),
        ext
    )
}

/// Filesystem-backed document store.
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    /// Create a new filesystem store rooted at the given directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Validate that the store can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (permission errors, missing directories) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join("docs/.health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err(format!("read-back mismatch at {:?}", test_file));
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FilesystemStore {
    async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            return Err(Error::InvalidInput("empty document".to_string()));
        }

        let content_hash = compute_content_hash(bytes);
        let id = new_v7();
        let path = generate_storage_path(&content_hash, &id, original_name);
        let full_path = self.full_path(&path);

        debug!(
            subsystem = "db",
            component = "documents",
            op = "store",
            storage_path = %path,
            size = bytes.len(),
            content_hash = %content_hash,
            "Storing document"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "documents: create_dir_all failed");
                e
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await?;

        Ok(path)
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        let bytes = fs::read(&full_path).await.map_err(|e| {
            warn!(storage_path = %path, error = %e, "documents: read failed");
            Error::NotFound(format!("document {}", path))
        })?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_format() {
        let hash = compute_content_hash(b"hello");
        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), "sha256:".len() + 64);
    }

    #[test]
    fn test_content_hash_deterministic() {
        assert_eq!(compute_content_hash(b"abc"), compute_content_hash(b"abc"));
        assert_ne!(compute_content_hash(b"abc"), compute_content_hash(b"abd"));
    }

    #[test]
    fn test_generate_storage_path_format() {
        let id = Uuid::nil();
        let hash = compute_content_hash(b"hello");
        let hex = hash.strip_prefix("sha256:").unwrap();

        let path = generate_storage_path(&hash, &id, "cv.pdf");
        assert_eq!(
            path,
            format!(
                "docs/{}/{}/00000000-0000-0000-0000-000000000000.pdf",
                &hex[0..2],
                &hex[2..4]
            )
        );
    }

    #[test]
    fn test_same_content_shares_prefix_directories() {
        let hash = compute_content_hash(b"same bytes");
        let a = generate_storage_path(&hash, &Uuid::from_u128(1), "a.pdf");
        let b = generate_storage_path(&hash, &Uuid::from_u128(2), "b.pdf");

        assert_eq!(a.rsplitn(2, '/').last(), b.rsplitn(2, '/').last());
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_storage_path_unknown_extension() {
        let hash = compute_content_hash(b"data");
        let path = generate_storage_path(&hash, &Uuid::nil(), "upload");
        assert!(path.ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_store_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());

        let path = store.store("cv.pdf", b"candidate cv content").await.unwrap();
        assert!(path.starts_with("docs/"));
        assert!(path.ends_with(".pdf"));

        let bytes = store.read(&path).await.unwrap();
        assert_eq!(bytes, b"candidate cv content");
    }

    #[tokio::test]
    async fn test_store_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        assert!(store.store("cv.pdf", b"").await.is_err());
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        let err = store.read("docs/00/00/missing.pdf").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_validate_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path());
        assert!(store.validate().await.is_ok());
    }
}
