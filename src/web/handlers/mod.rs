//! API handlers for the file storage API.

pub mod file;

pub use file::*;

use std::sync::Arc;

use crate::file::{FileRepository, FileService};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// File service backed by the SQLite repository.
    pub service: Arc<FileService<FileRepository>>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(service: FileService<FileRepository>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
