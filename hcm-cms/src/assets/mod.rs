//! Asset Store
//!
//! "Save an uploaded blob, return a stable reference; delete a blob by
//! reference." Store and delete are independent operations with no rollback.
//! Ordering guarantees between them belong to the lifecycle coordinator.

mod fs;

pub use fs::FsAssetStore;

use async_trait::async_trait;
use hcm_common::StorageError;
use std::time::SystemTime;

/// One file extracted from a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Multipart field the file arrived in (`upload`, `cover`, `attachment`)
    pub field_name: String,
    pub original_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(field_name: impl Into<String>, original_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field_name: field_name.into(),
            original_name: original_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Result of a successful store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Name of the file inside the asset root
    pub file_name: String,
    /// Served path persisted in entity rows (`/public/uploads/<file_name>`)
    pub reference: String,
}

/// A file currently present in the store
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub reference: String,
    pub modified: SystemTime,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Persist a blob under a collision-resistant name
    async fn store(&self, upload: &UploadedFile) -> Result<StoredAsset, StorageError>;

    /// Remove a blob. A missing file is not an error.
    async fn delete(&self, reference: &str) -> Result<(), StorageError>;

    /// Every file currently stored
    async fn list_stored(&self) -> Result<Vec<StoredFile>, StorageError>;

    /// Size ceiling for a single blob
    fn max_bytes(&self) -> u64;
}

/// Build the stored name: `<millis>-<original with whitespace runs as "_">`.
///
/// Only letters, digits, `.`, `-` and `_` survive; anything else becomes `_`.
/// The name then reads the same inside an HTML attribute and needs no escaping
/// in a URL path apart from non-ASCII letters.
pub fn stored_file_name(unix_millis: i64, original_name: &str) -> String {
    let mut sanitized = String::with_capacity(original_name.len());
    let mut in_space = false;

    for c in original_name.chars() {
        if c.is_whitespace() {
            if !in_space {
                sanitized.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
            sanitized.push(c);
        } else {
            sanitized.push('_');
        }
    }

    if sanitized.is_empty() {
        sanitized.push_str("upload");
    }

    format!("{}-{}", unix_millis, sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_name_replaces_whitespace_runs() {
        assert_eq!(
            stored_file_name(1700000000000, "my  cover\tphoto.jpg"),
            "1700000000000-my_cover_photo.jpg"
        );
    }

    #[test]
    fn test_stored_name_neutralizes_separators() {
        assert_eq!(stored_file_name(5, "../../etc/passwd"), "5-.._.._etc_passwd");
        assert_eq!(stored_file_name(5, "a\\b.png"), "5-a_b.png");
    }

    #[test]
    fn test_stored_name_drops_url_and_html_specials() {
        assert_eq!(stored_file_name(5, "a&b<c>\"d'e.png"), "5-a_b_c__d_e.png");
        assert_eq!(stored_file_name(5, "bai?1#x%20.png"), "5-bai_1_x_20.png");
        assert_eq!(stored_file_name(5, "hình ảnh.png"), "5-hình_ảnh.png");
    }

    #[test]
    fn test_stored_name_for_empty_original() {
        assert_eq!(stored_file_name(5, ""), "5-upload");
    }
}
