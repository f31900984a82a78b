//! Upload policy: which MIME types are accepted and how large a file may be.

use crate::config::StorageConfig;
use crate::{FileStoreError, Result};

use super::{DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_UPLOAD_SIZE};

/// Validation rules applied to every upload before bytes are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    allowed_types: Vec<String>,
    max_bytes: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_TYPES.iter().copied(), DEFAULT_MAX_UPLOAD_SIZE)
    }
}

impl UploadPolicy {
    /// Create a policy from an allow-list and a size cap in bytes.
    pub fn new<I, T>(allowed_types: I, max_bytes: u64) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            allowed_types: allowed_types
                .into_iter()
                .map(|t| Self::normalize(t.as_ref()))
                .collect(),
            max_bytes,
        }
    }

    /// Build the policy from the storage configuration.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.allowed_types, config.max_upload_size_bytes)
    }

    /// Accepted MIME types (normalized).
    pub fn allowed_types(&self) -> &[String] {
        &self.allowed_types
    }

    /// Size cap in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check a declared MIME type against the allow-list.
    ///
    /// Returns the normalized type to record.
    pub fn check_type(&self, declared: &str) -> Result<String> {
        let normalized = Self::normalize(declared);
        if self.allowed_types.iter().any(|t| *t == normalized) {
            Ok(normalized)
        } else {
            Err(FileStoreError::UnsupportedType(declared.trim().to_string()))
        }
    }

    /// Reject a declared length that already exceeds the cap.
    pub fn check_declared_len(&self, len: u64) -> Result<()> {
        if len > self.max_bytes {
            Err(FileStoreError::PayloadTooLarge {
                max_bytes: self.max_bytes,
            })
        } else {
            Ok(())
        }
    }

    /// Lowercase and strip parameters: `Image/PNG; q=1` becomes `image/png`.
    fn normalize(mime: &str) -> String {
        mime.split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase()
    }
}
