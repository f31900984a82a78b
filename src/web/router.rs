//! Router configuration for the file storage API.

use std::path::Path;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::handlers::{
    delete_file, download_file, get_file_metadata, list_files, upload_file, AppState,
};
use super::middleware::create_cors_layer;

/// Allowance for multipart boundaries and part headers on top of the file cap.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Create the main API router.
pub fn create_router(app_state: AppState, cors_origins: &[String]) -> Router {
    let body_limit = app_state
        .service
        .policy()
        .max_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let file_routes = Router::new()
        .route("/", get(list_files))
        .route(
            "/upload",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/:id", get(download_file).delete(delete_file))
        .route("/:id/metadata", get(get_file_metadata));

    let api_routes = Router::new().nest("/files", file_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create a read-only router exposing the upload directory under `/uploads`.
pub fn create_uploads_router(upload_dir: &Path) -> Router {
    Router::new().nest_service("/uploads", ServeDir::new(upload_dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_router() {
        let response = create_health_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_uploads_router_serves_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("1-ab-a.pdf"), b"%PDF").unwrap();

        let app = create_uploads_router(dir.path());
        let response = app
            .clone()
            .oneshot(Request::get("/uploads/1-ab-a.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/uploads/missing.pdf").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
