//! Response DTOs for the file storage API.

use serde::Serialize;

use crate::file::FileRecord;

/// Response to a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Confirmation message.
    pub message: String,
    /// ID assigned to the file.
    #[serde(rename = "fileId")]
    pub file_id: i64,
    /// The stored record.
    pub metadata: FileRecord,
}

impl UploadResponse {
    /// Build the response for a freshly stored record.
    pub fn new(record: FileRecord) -> Self {
        Self {
            message: "File uploaded successfully.".to_string(),
            file_id: record.id,
            metadata: record,
        }
    }
}

/// Plain message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

impl MessageResponse {
    /// Create a new message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// File listing.
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    /// Records, newest first.
    pub files: Vec<FileRecord>,
}
