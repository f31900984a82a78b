//! Request DTOs for the file storage API.

use serde::Deserialize;

/// Default number of records returned by `GET /api/files`.
pub const DEFAULT_LIST_LIMIT: i64 = 20;

/// Query parameters for listing files.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Maximum number of records to return.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIST_LIMIT
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}
