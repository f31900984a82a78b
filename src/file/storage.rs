//! Blob storage for filestore.
//!
//! Blobs live flat in the upload directory under a generated stored name:
//! ```text
//! {root}/
//! ├── .incoming/                                   staging for writes in progress
//! │   └── 1718000000123-9f3c2a7b41d0e865-scan.pdf
//! ├── 1717999999001-0a1b2c3d4e5f6071-photo.png
//! └── ...
//! ```
//! A write goes to `.incoming/` first and is renamed into place once complete,
//! so readers never see a partial blob.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::MAX_NAME_HINT_LENGTH;
use crate::{FileStoreError, Result};

/// Staging directory (inside the root) for blobs being written.
const STAGING_DIR: &str = ".incoming";

/// Attempts at finding an unused stored name before giving up.
const MAX_NAME_ATTEMPTS: usize = 4;

/// A blob that was written successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Generated stored name.
    pub stored_name: String,
    /// Number of bytes written.
    pub size: u64,
}

/// Open handle to a stored blob.
#[derive(Debug)]
pub struct BlobReader {
    file: File,
    len: u64,
}

impl BlobReader {
    /// Length of the blob in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the blob is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Turn the blob into a byte stream.
    pub fn into_stream(self) -> ReaderStream<File> {
        ReaderStream::new(self.file)
    }

    /// Read the whole blob into memory.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.len as usize);
        self.file.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

/// Removes a file when dropped unless disarmed.
///
/// Covers every early exit of a write, including the future being dropped
/// when a client disconnects mid-upload.
#[derive(Debug)]
pub struct BlobGuard {
    path: PathBuf,
    armed: bool,
}

impl BlobGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    /// Keep the file.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for BlobGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed abandoned blob"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove abandoned blob"
            ),
        }
    }
}

/// Filesystem blob store.
#[derive(Debug, Clone)]
pub struct BlobStore {
    /// Root directory for blobs.
    root: PathBuf,
}

impl BlobStore {
    /// Create a new BlobStore rooted at the given directory.
    ///
    /// The directory and its staging area are created if missing. Leftover
    /// staging files from an earlier crash are removed, which also discards
    /// writes in progress from any other store on the same directory: an
    /// upload directory belongs to one running instance at a time.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join(STAGING_DIR))?;

        let store = Self { root };
        let removed = store.cleanup_staging()?;
        if removed > 0 {
            warn!(removed, "Removed unfinished uploads from staging area");
        }

        Ok(store)
    }

    /// Get the root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write a byte stream to a new blob, enforcing `max_bytes` while writing.
    ///
    /// The stored name is derived from `name_hint`. On any failure the partial
    /// bytes are removed: an oversize stream yields `PayloadTooLarge`, a
    /// failing stream or disk yields `StorageWriteFailed`.
    pub async fn put<S, E>(&self, name_hint: &str, stream: S, max_bytes: u64) -> Result<StoredBlob>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let (stored_name, staging_path, mut file) = self.create_staging(name_hint).await?;
        let guard = BlobGuard::new(staging_path.clone());

        futures::pin_mut!(stream);
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                warn!(stored_name = %stored_name, error = %e, "Upload stream failed");
                FileStoreError::StorageWriteFailed(format!("upload stream failed: {e}"))
            })?;

            written += chunk.len() as u64;
            if written > max_bytes {
                debug!(stored_name = %stored_name, max_bytes, "Upload exceeded size cap");
                return Err(FileStoreError::PayloadTooLarge { max_bytes });
            }

            file.write_all(&chunk).await.map_err(write_failed)?;
        }

        file.flush().await.map_err(write_failed)?;
        file.sync_all().await.map_err(write_failed)?;
        drop(file);

        // The rename can finish in the background if this future is dropped
        // while it is in flight, so the final path is guarded too.
        let final_path = self.root.join(&stored_name);
        let placed = BlobGuard::new(final_path.clone());
        fs::rename(&staging_path, &final_path)
            .await
            .map_err(write_failed)?;
        guard.disarm();
        placed.disarm();

        debug!(stored_name = %stored_name, size = written, "Blob written");
        Ok(StoredBlob {
            stored_name,
            size: written,
        })
    }

    /// Open a blob for reading.
    pub async fn get(&self, stored_name: &str) -> Result<BlobReader> {
        let path = self.blob_path(stored_name).ok_or_else(|| not_found(stored_name))?;

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found(stored_name)),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();

        Ok(BlobReader { file, len })
    }

    /// Delete a blob.
    ///
    /// Fails with `NotFound` if the blob does not exist and with
    /// `StorageDeleteFailed` for any other error.
    pub async fn delete(&self, stored_name: &str) -> Result<()> {
        let path = self.blob_path(stored_name).ok_or_else(|| not_found(stored_name))?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(stored_name = %stored_name, "Blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(stored_name)),
            Err(e) => Err(FileStoreError::StorageDeleteFailed(format!(
                "{stored_name}: {e}"
            ))),
        }
    }

    /// Check if a blob exists.
    pub async fn exists(&self, stored_name: &str) -> bool {
        match self.blob_path(stored_name) {
            Some(path) => fs::try_exists(path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Get the size of a stored blob.
    pub async fn blob_len(&self, stored_name: &str) -> Result<u64> {
        let path = self.blob_path(stored_name).ok_or_else(|| not_found(stored_name))?;

        match fs::metadata(&path).await {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found(stored_name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every file left in the staging area.
    ///
    /// Returns the number of files removed. Files that cannot be removed are
    /// logged and skipped.
    pub fn cleanup_staging(&self) -> Result<usize> {
        let mut removed = 0;

        for entry in std::fs::read_dir(self.root.join(STAGING_DIR))?.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove staging file"
                ),
            }
        }

        Ok(removed)
    }

    /// Generate a new stored name from a client-supplied name.
    ///
    /// Format: `{unix millis}-{16 hex random}-{sanitized hint}`.
    pub fn generate_stored_name(name_hint: &str) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let suffix: u64 = rand::random();
        format!("{millis}-{suffix:016x}-{}", Self::sanitize_hint(name_hint))
    }

    /// Reduce a client-supplied name to a safe final path component.
    ///
    /// Only the part after the last `/` or `\` is kept; characters outside
    /// `[A-Za-z0-9._-]` become `_`.
    fn sanitize_hint(name_hint: &str) -> String {
        let base = name_hint.rsplit(['/', '\\']).next().unwrap_or("");

        let sanitized: String = base
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .take(MAX_NAME_HINT_LENGTH)
            .collect();

        if sanitized.trim_matches('.').is_empty() {
            "file".to_string()
        } else {
            sanitized
        }
    }

    /// Whether a stored name stays inside the root directory.
    fn is_valid_stored_name(stored_name: &str) -> bool {
        !stored_name.is_empty()
            && !stored_name.starts_with('.')
            && !stored_name.contains(['/', '\\', '\0'])
    }

    /// Full path for a stored name, or `None` if the name is not acceptable.
    fn blob_path(&self, stored_name: &str) -> Option<PathBuf> {
        Self::is_valid_stored_name(stored_name).then(|| self.root.join(stored_name))
    }

    /// Create the staging file for a new blob under a fresh name.
    async fn create_staging(&self, name_hint: &str) -> Result<(String, PathBuf, File)> {
        for _ in 0..MAX_NAME_ATTEMPTS {
            let stored_name = Self::generate_stored_name(name_hint);
            if fs::try_exists(self.root.join(&stored_name))
                .await
                .unwrap_or(false)
            {
                continue;
            }

            let staging_path = self.root.join(STAGING_DIR).join(&stored_name);
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&staging_path)
                .await
            {
                Ok(file) => return Ok((stored_name, staging_path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(write_failed(e)),
            }
        }

        Err(FileStoreError::StorageWriteFailed(
            "could not allocate a unique stored name".to_string(),
        ))
    }
}

fn not_found(stored_name: &str) -> FileStoreError {
    FileStoreError::NotFound(format!("blob {stored_name}"))
}

fn write_failed(e: io::Error) -> FileStoreError {
    FileStoreError::StorageWriteFailed(e.to_string())
}
