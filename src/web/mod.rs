//! Web API module for filestore.
//!
//! This module provides the HTTP surface: upload, download, metadata, listing
//! and deletion of files under `/api/files`, plus a health check.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
