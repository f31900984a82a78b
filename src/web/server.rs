//! Web server for filestore.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::file::{BlobStore, FileRepository, FileService, UploadPolicy};
use crate::{Database, FileStoreError, Result};

use super::handlers::AppState;
use super::router::{create_health_router, create_router, create_uploads_router};

/// Web server for the API.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: AppState,
    /// Allowed CORS origins.
    cors_origins: Vec<String>,
    /// Upload directory, if it should be served under `/uploads`.
    serve_uploads: Option<PathBuf>,
}

impl WebServer {
    /// Create a new web server.
    ///
    /// Opens the blob store (creating the upload directory) and wires it to
    /// the metadata repository on `db`.
    pub fn new(config: &Config, db: &Database) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| FileStoreError::Config(format!("invalid server address: {e}")))?;

        let storage = BlobStore::new(&config.storage.upload_dir)?;
        let service = FileService::new(
            storage,
            FileRepository::new(db.pool()),
            UploadPolicy::from_config(&config.storage),
        );
        tracing::info!(
            upload_dir = %config.storage.upload_dir,
            max_bytes = config.storage.max_upload_size_bytes,
            "File storage initialized"
        );

        let serve_uploads = config
            .storage
            .serve_uploads
            .then(|| PathBuf::from(&config.storage.upload_dir));

        Ok(Self {
            addr,
            app_state: AppState::new(service),
            cors_origins: config.server.cors_origins.clone(),
            serve_uploads,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the full application router.
    pub fn router(&self) -> Router {
        let mut router =
            create_router(self.app_state.clone(), &self.cors_origins).merge(create_health_router());

        if let Some(dir) = &self.serve_uploads {
            router = router.merge(create_uploads_router(dir));
        }

        router
    }

    /// Run the web server until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
    }

    /// Run the server and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.storage.upload_dir = dir.path().join("uploads").to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn test_web_server_new() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir);
        let db = Database::open_in_memory().await.unwrap();

        let server = WebServer::new(&config, &db).unwrap();
        assert_eq!(server.addr().ip().to_string(), "127.0.0.1");
        assert!(dir.path().join("uploads").is_dir());
    }

    #[tokio::test]
    async fn test_web_server_invalid_host() {
        let dir = TempDir::new().unwrap();
        let mut config = create_test_config(&dir);
        config.server.host = "not a host".to_string();
        let db = Database::open_in_memory().await.unwrap();

        assert!(matches!(
            WebServer::new(&config, &db),
            Err(FileStoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_web_server_run() {
        let dir = TempDir::new().unwrap();
        let config = create_test_config(&dir);
        let db = Database::open_in_memory().await.unwrap();

        let server = WebServer::new(&config, &db).unwrap();
        let addr = server.run_with_addr().await.unwrap();

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();

        assert!(resp.status().is_success());
        assert_eq!(resp.text().await.unwrap(), "OK");

        let resp = client
            .get(format!("http://{}/api/files/1", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 404);
    }
}
