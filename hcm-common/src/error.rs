//! Common error types for the content backend

use thiserror::Error;

/// Common result type for content operations
pub type Result<T> = std::result::Result<T, Error>;

/// Asset storage failures
#[derive(Error, Debug)]
pub enum StorageError {
    /// Upload exceeds the configured size ceiling
    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// Filesystem failure while writing or reading a blob
    #[error("asset I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Error taxonomy shared by the repository, asset store and coordinator
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error outside the asset store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed input field
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Entity is still referenced and cannot be removed
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Asset could not be stored; nothing was persisted
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    /// Row write failed after a new asset was stored.
    /// The stored blob stays on disk with no owner.
    #[error("Write failed, stored asset {reference} is orphaned: {source}")]
    OrphanedAsset {
        reference: String,
        #[source]
        source: Box<Error>,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the not-found case, which callers may treat as a 404
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
