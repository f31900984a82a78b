//! filestore - file storage service
//!
//! Accepts file uploads over HTTP, stores the bytes on disk, records metadata
//! in SQLite, and serves retrieval and deletion by file id.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{FileStoreError, Result};
pub use file::{
    BlobStore, FileRecord, FileRepository, FileService, MetadataStore, RetrievedFile,
    UploadPolicy, UploadRequest,
};
pub use web::WebServer;
