//! Configuration module for filestore.

use serde::Deserialize;
use std::path::Path;

use crate::file::{DEFAULT_ALLOWED_TYPES, DEFAULT_MAX_UPLOAD_SIZE};
use crate::{FileStoreError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins (empty = any origin).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/filestore.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Blob storage and upload policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory that holds uploaded blobs.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_bytes: u64,
    /// MIME types accepted for upload.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Expose the upload directory read-only under `/uploads`.
    #[serde(default)]
    pub serve_uploads: bool,
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    DEFAULT_MAX_UPLOAD_SIZE
}

fn default_allowed_types() -> Vec<String> {
    DEFAULT_ALLOWED_TYPES.iter().map(|s| s.to_string()).collect()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            max_upload_size_bytes: default_max_upload_size(),
            allowed_types: default_allowed_types(),
            serve_uploads: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filestore.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FileStoreError::Config(e.to_string()))
    }

    /// Apply environment variable overrides.
    ///
    /// Recognized variables: `PORT`, `UPLOAD_DIR`, `DATABASE_PATH`,
    /// `MAX_UPLOAD_SIZE` (bytes) and `LOG_LEVEL`. Empty or unparsable values
    /// are ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT").and_then(|v| v.trim().parse().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = get("UPLOAD_DIR") {
            self.storage.upload_dir = dir;
        }
        if let Some(path) = get("DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(size) = get("MAX_UPLOAD_SIZE").and_then(|v| v.trim().parse().ok()) {
            self.storage.max_upload_size_bytes = size;
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.storage.max_upload_size_bytes == 0 {
            return Err(FileStoreError::Config(
                "storage.max_upload_size_bytes must be greater than 0".to_string(),
            ));
        }
        if self.storage.allowed_types.is_empty() {
            return Err(FileStoreError::Config(
                "storage.allowed_types must not be empty".to_string(),
            ));
        }
        for ty in &self.storage.allowed_types {
            if ty.parse::<mime_guess::mime::Mime>().is_err() {
                return Err(FileStoreError::Config(format!(
                    "storage.allowed_types contains an invalid MIME type: {ty}"
                )));
            }
        }
        if self.storage.upload_dir.trim().is_empty() {
            return Err(FileStoreError::Config(
                "storage.upload_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert!(config.server.cors_origins.is_empty());

        assert_eq!(config.database.path, "data/filestore.db");

        assert_eq!(config.storage.upload_dir, "uploads");
        assert_eq!(config.storage.max_upload_size_bytes, 5 * 1024 * 1024);
        assert_eq!(
            config.storage.allowed_types,
            vec!["image/jpeg", "image/png", "application/pdf"]
        );
        assert!(!config.storage.serve_uploads);

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/filestore.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080
cors_origins = ["http://localhost:5173"]

[database]
path = "custom/db.sqlite"

[storage]
upload_dir = "custom/uploads"
max_upload_size_bytes = 1048576
allowed_types = ["image/gif"]
serve_uploads = true

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.database.path, "custom/db.sqlite");
        assert_eq!(config.storage.upload_dir, "custom/uploads");
        assert_eq!(config.storage.max_upload_size_bytes, 1048576);
        assert_eq!(config.storage.allowed_types, vec!["image/gif"]);
        assert!(config.storage.serve_uploads);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, "custom/logs/app.log");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 4000
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.max_upload_size_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.upload_dir, "uploads");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[server]\nport = \"not a number\"");
        assert!(matches!(result, Err(FileStoreError::Config(_))));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent/config.toml");
        assert!(matches!(result, Err(FileStoreError::Io(_))));
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "9000"),
            ("UPLOAD_DIR", "/var/uploads"),
            ("DATABASE_PATH", "/var/db.sqlite"),
            ("MAX_UPLOAD_SIZE", "2048"),
            ("LOG_LEVEL", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.upload_dir, "/var/uploads");
        assert_eq!(config.database.path, "/var/db.sqlite");
        assert_eq!(config.storage.max_upload_size_bytes, 2048);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_apply_overrides_empty_and_invalid_values() {
        let env: HashMap<&str, &str> = [("PORT", "abc"), ("UPLOAD_DIR", "  ")]
            .into_iter()
            .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.upload_dir, "uploads");
    }

    #[test]
    fn test_validate_default() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_cap() {
        let mut config = Config::default();
        config.storage.max_upload_size_bytes = 0;
        assert!(matches!(config.validate(), Err(FileStoreError::Config(_))));
    }

    #[test]
    fn test_validate_empty_allow_list() {
        let mut config = Config::default();
        config.storage.allowed_types.clear();
        assert!(matches!(config.validate(), Err(FileStoreError::Config(_))));
    }

    #[test]
    fn test_validate_invalid_mime() {
        let mut config = Config::default();
        config.storage.allowed_types.push("not-a-mime".to_string());
        assert!(matches!(config.validate(), Err(FileStoreError::Config(_))));
    }
}
