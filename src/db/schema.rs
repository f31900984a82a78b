//! Database schema and migrations for filestore.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: file metadata
    r#"
-- One row per stored blob. `filename` is the stored name in the upload directory.
CREATE TABLE files (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    filename          TEXT NOT NULL UNIQUE,
    file_type         TEXT NOT NULL,
    file_size         INTEGER NOT NULL CHECK (file_size >= 0),
    upload_timestamp  TEXT NOT NULL
);

CREATE INDEX idx_files_upload_timestamp ON files(upload_timestamp);
"#,
];
