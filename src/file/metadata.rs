//! File metadata records and repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::{FileStoreError, Result};

/// Metadata for one stored blob.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Stored name of the blob in the upload directory.
    pub filename: String,
    /// MIME type accepted at upload.
    pub file_type: String,
    /// Blob size in bytes.
    pub file_size: i64,
    /// When the file was uploaded.
    pub upload_timestamp: DateTime<Utc>,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Stored name of the blob.
    pub filename: String,
    /// MIME type.
    pub file_type: String,
    /// Blob size in bytes.
    pub file_size: i64,
    /// Upload time.
    pub upload_timestamp: DateTime<Utc>,
}

impl NewFileRecord {
    /// Create a new record stamped with the current time.
    pub fn new(filename: impl Into<String>, file_type: impl Into<String>, file_size: i64) -> Self {
        Self {
            filename: filename.into(),
            file_type: file_type.into(),
            file_size,
            upload_timestamp: Utc::now(),
        }
    }
}

/// Storage for file records.
///
/// Records are write-once: there is no update operation. Errors are reported
/// as `MetadataWriteFailed` (insert, delete) or `MetadataReadFailed` (lookup).
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a record and return it with its assigned ID.
    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord>;

    /// Find a record by ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>>;

    /// Delete a record by ID. Returns `false` if it did not exist.
    async fn delete_by_id(&self, id: i64) -> Result<bool>;
}

/// SQLite-backed file record repository.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: SqlitePool,
}

impl FileRepository {
    /// Create a new FileRepository over the given pool.
    pub fn new(pool: &SqlitePool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Find a record by its stored name.
    pub async fn find_by_filename(&self, filename: &str) -> Result<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, file_type, file_size, upload_timestamp
             FROM files WHERE filename = ?",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| FileStoreError::MetadataReadFailed(e.to_string()))
    }

    /// List the most recent records, newest first.
    pub async fn list_recent(&self, limit: i64) -> Result<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, file_type, file_size, upload_timestamp
             FROM files ORDER BY upload_timestamp DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| FileStoreError::MetadataReadFailed(e.to_string()))
    }

    /// Count all records.
    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| FileStoreError::MetadataReadFailed(e.to_string()))
    }
}

#[async_trait]
impl MetadataStore for FileRepository {
    async fn insert(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (filename, file_type, file_size, upload_timestamp)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&record.filename)
        .bind(&record.file_type)
        .bind(record.file_size)
        .bind(record.upload_timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| FileStoreError::MetadataWriteFailed(e.to_string()))?;

        Ok(FileRecord {
            id,
            filename: record.filename.clone(),
            file_type: record.file_type.clone(),
            file_size: record.file_size,
            upload_timestamp: record.upload_timestamp,
        })
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, file_type, file_size, upload_timestamp
             FROM files WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| FileStoreError::MetadataReadFailed(e.to_string()))
    }

    async fn delete_by_id(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| FileStoreError::MetadataWriteFailed(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Duration;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_record() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let record = repo
            .insert(&NewFileRecord::new("1-aa-photo.png", "image/png", 1024))
            .await
            .unwrap();

        assert!(record.id > 0);
        assert_eq!(record.filename, "1-aa-photo.png");
        assert_eq!(record.file_type, "image/png");
        assert_eq!(record.file_size, 1024);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let created = repo
            .insert(&NewFileRecord::new("1-aa-doc.pdf", "application/pdf", 10))
            .await
            .unwrap();

        let found = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.filename, "1-aa-doc.pdf");
        assert_eq!(found.file_type, "application/pdf");
        assert_eq!(found.file_size, 10);
        assert_eq!(
            found.upload_timestamp.timestamp_millis(),
            created.upload_timestamp.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        assert!(repo.find_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_filename() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        repo.insert(&NewFileRecord::new("1-aa-a.png", "image/png", 1))
            .await
            .unwrap();

        let found = repo.find_by_filename("1-aa-a.png").await.unwrap();
        assert_eq!(found.unwrap().file_size, 1);
        assert!(repo.find_by_filename("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let a = repo.insert(&NewFileRecord::new("a", "image/png", 1)).await.unwrap();
        let b = repo.insert(&NewFileRecord::new("b", "image/png", 1)).await.unwrap();

        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_duplicate_filename_rejected() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        repo.insert(&NewFileRecord::new("dup", "image/png", 1)).await.unwrap();
        let result = repo.insert(&NewFileRecord::new("dup", "image/png", 1)).await;

        assert!(matches!(result, Err(FileStoreError::MetadataWriteFailed(_))));
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());

        let record = repo.insert(&NewFileRecord::new("x", "image/png", 1)).await.unwrap();

        assert!(repo.delete_by_id(record.id).await.unwrap());
        assert!(repo.find_by_id(record.id).await.unwrap().is_none());
        assert!(!repo.delete_by_id(record.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_recent_and_count() {
        let db = setup_db().await;
        let repo = FileRepository::new(db.pool());
        let base = Utc::now();

        for i in 0..3 {
            let mut record = NewFileRecord::new(format!("f{i}"), "image/png", i);
            record.upload_timestamp = base + Duration::seconds(i);
            repo.insert(&record).await.unwrap();
        }

        let recent = repo.list_recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].filename, "f2");
        assert_eq!(recent[1].filename, "f1");
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = FileRecord {
            id: 7,
            filename: "1-aa-photo.png".to_string(),
            file_type: "image/png".to_string(),
            file_size: 3,
            upload_timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["fileType"], "image/png");
        assert_eq!(json["fileSize"], 3);
        assert!(json["uploadTimestamp"].is_string());
    }
}
