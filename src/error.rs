//! Error types for filestore.

use thiserror::Error;

/// Common error type for filestore.
///
/// The first group of variants is the taxonomy the file operations report to
/// callers. The variant decides what the HTTP layer answers and whether a
/// compensating delete already ran.
#[derive(Error, Debug)]
pub enum FileStoreError {
    /// The declared MIME type is not in the allow-list. Nothing was written.
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    /// The upload exceeded the configured size cap. Partial bytes were removed.
    #[error("file too large (max {max_bytes} bytes)")]
    PayloadTooLarge {
        /// The cap that was exceeded.
        max_bytes: u64,
    },

    /// Record or blob does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A record exists but its blob is missing.
    #[error("storage inconsistent: {0}")]
    StorageInconsistent(String),

    /// Writing blob bytes failed. No blob was left behind.
    #[error("storage write failed: {0}")]
    StorageWriteFailed(String),

    /// Writing or deleting a metadata record failed.
    ///
    /// During upload this is returned after the blob has been compensated.
    #[error("metadata write failed: {0}")]
    MetadataWriteFailed(String),

    /// Deleting a blob failed for a reason other than absence.
    #[error("storage delete failed: {0}")]
    StorageDeleteFailed(String),

    /// Looking up a metadata record failed.
    #[error("metadata read failed: {0}")]
    MetadataReadFailed(String),

    /// Database setup error (open, migrate).
    #[error("database error: {0}")]
    Database(String),

    /// I/O error outside the blob operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FileStoreError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            FileStoreError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            FileStoreError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            FileStoreError::NotFound(_) => "NOT_FOUND",
            FileStoreError::StorageInconsistent(_) => "STORAGE_INCONSISTENT",
            FileStoreError::StorageWriteFailed(_) => "STORAGE_WRITE_FAILED",
            FileStoreError::MetadataWriteFailed(_) => "METADATA_WRITE_FAILED",
            FileStoreError::StorageDeleteFailed(_) => "STORAGE_DELETE_FAILED",
            FileStoreError::MetadataReadFailed(_) => "METADATA_READ_FAILED",
            FileStoreError::Database(_) => "DATABASE_ERROR",
            FileStoreError::Io(_) => "IO_ERROR",
            FileStoreError::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Whether the error was caused by the client's input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FileStoreError::UnsupportedType(_) | FileStoreError::PayloadTooLarge { .. }
        )
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for FileStoreError {
    fn from(e: sqlx::Error) -> Self {
        FileStoreError::Database(e.to_string())
    }
}

/// Result type alias for filestore operations.
pub type Result<T> = std::result::Result<T, FileStoreError>;
