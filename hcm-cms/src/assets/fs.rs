//! Filesystem-backed asset store
//!
//! Blobs live flat in one directory and are served at `<url_prefix>/<name>`.

use super::{stored_file_name, AssetStore, StoredAsset, StoredFile, UploadedFile};
use async_trait::async_trait;
use hcm_common::time::{now, unix_millis};
use hcm_common::StorageError;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Same-millisecond name collisions retried before giving up
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
    url_prefix: String,
    max_bytes: u64,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            root: root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    /// Create the asset root if missing
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn reference_for(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name)
    }

    /// Map a reference back to a file inside the root.
    ///
    /// Returns None for references with a foreign prefix or anything that is
    /// not a single plain file name.
    pub fn path_for_reference(&self, reference: &str) -> Option<PathBuf> {
        let name = reference.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains('\\') => Some(self.root.join(name)),
            _ => None,
        }
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn store(&self, upload: &UploadedFile) -> Result<StoredAsset, StorageError> {
        if upload.size() > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: upload.size(),
                limit: self.max_bytes,
            });
        }

        let base = stored_file_name(unix_millis(&now()), &upload.original_name);

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let file_name = if attempt == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, attempt)
            };
            let path = self.root.join(&file_name);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = write_all(&mut file, &upload.bytes).await {
                // Do not leave a truncated blob behind
                drop(file);
                let _ = tokio::fs::remove_file(&path).await;
                return Err(e.into());
            }

            debug!("Stored {} ({} bytes)", file_name, upload.size());
            return Ok(StoredAsset {
                reference: self.reference_for(&file_name),
                file_name,
            });
        }

        Err(StorageError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free name for {}", base),
        )))
    }

    async fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let Some(path) = self.path_for_reference(reference) else {
            debug!("Ignoring delete of foreign reference {}", reference);
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_stored(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            files.push(StoredFile {
                reference: self.reference_for(&file_name),
                file_name,
                modified: metadata.modified()?,
            });
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }

    fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

async fn write_all(file: &mut tokio::fs::File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FsAssetStore {
        FsAssetStore::new(dir.path(), "/public/uploads", 1024)
    }

    #[tokio::test]
    async fn test_store_writes_blob_and_returns_reference() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let stored = store
            .store(&UploadedFile::new("cover", "my cover.png", b"png-bytes".to_vec()))
            .await
            .unwrap();

        assert!(stored.file_name.ends_with("-my_cover.png"));
        assert_eq!(stored.reference, format!("/public/uploads/{}", stored.file_name));
        let on_disk = std::fs::read(dir.path().join(&stored.file_name)).unwrap();
        assert_eq!(on_disk, b"png-bytes");
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut references = Vec::new();
        for i in 0..5u8 {
            let stored = store
                .store(&UploadedFile::new("upload", "same.txt", vec![i]))
                .await
                .unwrap();
            references.push(stored.file_name);
        }

        references.sort();
        references.dedup();
        assert_eq!(references.len(), 5);
        assert_eq!(store.list_stored().await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_oversize_upload_rejected_without_writing() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let result = store
            .store(&UploadedFile::new("upload", "big.bin", vec![0u8; 1025]))
            .await;

        assert!(matches!(result, Err(StorageError::TooLarge { size: 1025, limit: 1024 })));
        assert!(store.list_stored().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_into_missing_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = FsAssetStore::new(dir.path().join("missing"), "/public/uploads", 1024);

        let result = store.store(&UploadedFile::new("upload", "a.txt", b"a".to_vec())).await;
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let stored = store
            .store(&UploadedFile::new("upload", "a.txt", b"a".to_vec()))
            .await
            .unwrap();

        store.delete(&stored.reference).await.unwrap();
        assert!(!dir.path().join(&stored.file_name).exists());
        store.delete(&stored.reference).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_ignores_escaping_references() {
        let dir = TempDir::new().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"keep").unwrap();
        let store = FsAssetStore::new(dir.path().join("uploads"), "/public/uploads", 1024);

        store.delete("/public/uploads/../keep.txt").await.unwrap();
        store.delete("/elsewhere/keep.txt").await.unwrap();

        assert!(outside.exists());
    }

    #[test]
    fn test_path_for_reference() {
        let store = FsAssetStore::new("/srv/uploads", "/public/uploads/", 1);
        assert_eq!(
            store.path_for_reference("/public/uploads/1-a.png"),
            Some(PathBuf::from("/srv/uploads/1-a.png"))
        );
        assert_eq!(store.path_for_reference("/public/uploads/"), None);
        assert_eq!(store.path_for_reference("/public/uploads/a/b.png"), None);
        assert_eq!(store.path_for_reference("/public/uploads/.."), None);
        assert_eq!(store.path_for_reference("/public/uploadsX/a.png"), None);
    }
}
