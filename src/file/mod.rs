//! File management module for filestore.
//!
//! This module provides:
//! - Blob storage on the local filesystem with generated unique names
//! - File metadata records and their repository
//! - Upload policy (MIME allow-list, size cap)
//! - The upload, retrieval and deletion service keeping blobs and records in step

mod metadata;
mod policy;
mod service;
mod storage;

pub use metadata::{FileRecord, FileRepository, MetadataStore, NewFileRecord};
pub use policy::UploadPolicy;
pub use service::{FileService, RetrievedFile, UploadRequest, MAX_LIST_LIMIT};
pub use storage::{BlobGuard, BlobReader, BlobStore, StoredBlob};

/// Maximum length for the client-supplied part of a stored name (in characters).
pub const MAX_NAME_HINT_LENGTH: usize = 100;

/// Default maximum upload size (5MB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 5 * 1024 * 1024;

/// MIME types accepted when no allow-list is configured.
pub const DEFAULT_ALLOWED_TYPES: &[&str] = &["image/jpeg", "image/png", "application/pdf"];
