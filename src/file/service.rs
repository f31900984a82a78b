//! File service for filestore.
//!
//! Keeps blobs and records in step:
//! - Upload: validate, write the blob, then insert the record; undo the blob
//!   if the insert fails or the upload is cancelled
//! - Retrieve: a record whose blob is gone is reported as inconsistent
//! - Remove: the blob goes first, the record only once the blob is gone

use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use tracing::{error, info, warn};

use crate::{FileStoreError, Result};

use super::metadata::{FileRecord, FileRepository, MetadataStore, NewFileRecord};
use super::policy::UploadPolicy;
use super::storage::{BlobReader, BlobStore};

/// Upper bound on records returned by [`FileService::list`].
pub const MAX_LIST_LIMIT: i64 = 100;

/// Request data for a file upload. The bytes are passed separately as a stream.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Original filename as supplied by the client.
    pub filename: String,
    /// Declared MIME type.
    pub content_type: String,
    /// Declared length in bytes, if known.
    pub content_length: Option<u64>,
}

impl UploadRequest {
    /// Create a new upload request.
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            content_length: None,
        }
    }

    /// Set the declared length.
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }
}

/// A file ready to be sent back to a client.
#[derive(Debug)]
pub struct RetrievedFile {
    /// File record.
    pub record: FileRecord,
    /// Open blob.
    pub blob: BlobReader,
}

impl RetrievedFile {
    /// MIME type recorded at upload.
    pub fn file_type(&self) -> &str {
        &self.record.file_type
    }

    /// Stored name of the blob.
    pub fn filename(&self) -> &str {
        &self.record.filename
    }
}

/// File service coordinating blob storage and metadata.
#[derive(Debug)]
pub struct FileService<M> {
    storage: BlobStore,
    metadata: Arc<M>,
    policy: UploadPolicy,
}

impl<M: MetadataStore + 'static> FileService<M> {
    /// Create a new FileService.
    pub fn new(storage: BlobStore, metadata: M, policy: UploadPolicy) -> Self {
        Self {
            storage,
            metadata: Arc::new(metadata),
            policy,
        }
    }

    /// Get the blob store.
    pub fn storage(&self) -> &BlobStore {
        &self.storage
    }

    /// Get the metadata store.
    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    /// Get the upload policy.
    pub fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Upload a file.
    ///
    /// # Validation
    /// - MIME type must be in the allow-list (checked before any write)
    /// - Size must not exceed the cap (checked up front when the length is
    ///   declared, and always while writing)
    ///
    /// # Consistency
    /// The blob is written before the record is inserted. If the insert fails
    /// the blob is deleted again and `MetadataWriteFailed` is returned.
    ///
    /// Dropping this future while the blob is being written removes the
    /// partial blob. Once the blob is complete, the insert and any
    /// compensation run on a spawned task that finishes even if the caller
    /// goes away, so a record never outlives its blob.
    pub async fn upload<S, E>(&self, request: &UploadRequest, body: S) -> Result<FileRecord>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let file_type = self.policy.check_type(&request.content_type)?;
        if let Some(len) = request.content_length {
            self.policy.check_declared_len(len)?;
        }

        let blob = self
            .storage
            .put(&request.filename, body, self.policy.max_bytes())
            .await?;

        let new_record = NewFileRecord::new(&blob.stored_name, file_type, blob.size as i64);
        let commit = tokio::spawn(commit_upload(
            self.storage.clone(),
            Arc::clone(&self.metadata),
            new_record,
        ));

        match commit.await {
            Ok(result) => result,
            Err(e) => {
                error!(
                    stored_name = %blob.stored_name,
                    error = %e,
                    "Upload commit task failed"
                );
                Err(FileStoreError::MetadataWriteFailed(format!(
                    "commit of {} did not complete: {e}",
                    blob.stored_name
                )))
            }
        }
    }

    /// Retrieve a file for download.
    ///
    /// Returns `NotFound` if no record exists and `StorageInconsistent` if the
    /// record exists but its blob does not.
    pub async fn retrieve(&self, id: i64) -> Result<RetrievedFile> {
        let record = self.find_record(id).await?;

        match self.storage.get(&record.filename).await {
            Ok(blob) => {
                if blob.len() != record.file_size as u64 {
                    warn!(
                        file_id = id,
                        stored_name = %record.filename,
                        recorded = record.file_size,
                        actual = blob.len(),
                        "Blob size differs from record"
                    );
                }
                Ok(RetrievedFile { record, blob })
            }
            Err(FileStoreError::NotFound(_)) => {
                error!(
                    file_id = id,
                    stored_name = %record.filename,
                    "Record exists but blob is missing"
                );
                Err(FileStoreError::StorageInconsistent(format!(
                    "file {id} has no blob {}",
                    record.filename
                )))
            }
            Err(e) => Err(e),
        }
    }

    /// Get a file record without opening the blob.
    pub async fn get_record(&self, id: i64) -> Result<FileRecord> {
        self.find_record(id).await
    }

    /// Remove a file: blob first, then record.
    ///
    /// A blob that is already gone does not block removal of the record. Any
    /// other blob deletion failure leaves the record in place.
    pub async fn remove(&self, id: i64) -> Result<()> {
        let record = self.find_record(id).await?;

        match self.storage.delete(&record.filename).await {
            Ok(()) => {}
            Err(FileStoreError::NotFound(_)) => {
                warn!(
                    file_id = id,
                    stored_name = %record.filename,
                    "Blob already missing; removing record"
                );
            }
            Err(e) => {
                error!(
                    file_id = id,
                    stored_name = %record.filename,
                    error = %e,
                    "Failed to delete blob; record kept"
                );
                return Err(e);
            }
        }

        if !self.metadata.delete_by_id(id).await? {
            return Err(FileStoreError::NotFound(format!("file {id}")));
        }

        info!(file_id = id, stored_name = %record.filename, "File deleted");
        Ok(())
    }

    async fn find_record(&self, id: i64) -> Result<FileRecord> {
        self.metadata
            .find_by_id(id)
            .await?
            .ok_or_else(|| FileStoreError::NotFound(format!("file {id}")))
    }
}

/// Insert the record for a completed blob, deleting the blob if that fails.
async fn commit_upload<M: MetadataStore>(
    storage: BlobStore,
    metadata: Arc<M>,
    new_record: NewFileRecord,
) -> Result<FileRecord> {
    match metadata.insert(&new_record).await {
        Ok(record) => {
            info!(
                file_id = record.id,
                stored_name = %record.filename,
                size = record.file_size,
                file_type = %record.file_type,
                "File uploaded"
            );
            Ok(record)
        }
        Err(e) => Err(compensate_upload(&storage, &new_record.filename, e).await),
    }
}

/// Delete a just-written blob after its record could not be inserted.
async fn compensate_upload(
    storage: &BlobStore,
    stored_name: &str,
    cause: FileStoreError,
) -> FileStoreError {
    let cause = match cause {
        FileStoreError::MetadataWriteFailed(msg) => msg,
        other => other.to_string(),
    };

    match storage.delete(stored_name).await {
        Ok(()) => {
            warn!(
                stored_name = %stored_name,
                error = %cause,
                "Metadata insert failed; blob removed"
            );
            FileStoreError::MetadataWriteFailed(cause)
        }
        Err(delete_err) => {
            error!(
                stored_name = %stored_name,
                error = %cause,
                compensation_error = %delete_err,
                "Metadata insert failed and the blob could not be removed"
            );
            FileStoreError::MetadataWriteFailed(format!(
                "{cause}; removing blob {stored_name} also failed: {delete_err}"
            ))
        }
    }
}

impl FileService<FileRepository> {
    /// List the most recent records, newest first. `limit` is clamped to 1..=100.
    pub async fn list(&self, limit: i64) -> Result<Vec<FileRecord>> {
        self.metadata.list_recent(limit.clamp(1, MAX_LIST_LIMIT)).await
    }
}
