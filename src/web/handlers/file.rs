//! File handlers for the file storage API.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
    Json,
};

use crate::file::{FileRecord, UploadRequest};
use crate::web::dto::{FileListResponse, ListQuery, MessageResponse, UploadResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Multipart field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Content type assumed when a part does not declare one.
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Generate the Content-Disposition header value for a download.
///
/// Stored names only contain `[A-Za-z0-9._-]`, but anything else is stripped
/// or escaped so a bad record cannot inject headers.
fn content_disposition_header(filename: &str) -> String {
    let plain = filename
        .chars()
        .all(|c| c.is_ascii() && !c.is_control() && c != '"' && c != '\\');
    if plain {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() => c,
            _ => '_',
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

/// Parse a path id. Anything that is not an integer cannot name a file.
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::not_found("File not found."))
}

/// POST /api/files/upload - Upload a file.
///
/// Request body: multipart/form-data with a `file` field. The part is streamed
/// into the blob store; other fields are ignored.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data.")
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        let request = UploadRequest::new(filename, content_type);
        let record = state.service.upload(&request, field).await?;

        return Ok(Json(UploadResponse::new(record)));
    }

    Err(ApiError::bad_request("No file uploaded."))
}

/// GET /api/files/:id - Download a file.
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let id = parse_id(&id)?;
    let file = state.service.retrieve(id).await?;

    let content_disposition = content_disposition_header(file.filename());
    let content_type = file.file_type().to_string();
    let len = file.blob.len();

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, len)
        .body(Body::from_stream(file.blob.into_stream()))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Error retrieving the file.")
        })
}

/// GET /api/files/:id/metadata - Get a file record.
pub async fn get_file_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.get_record(id).await?))
}

/// GET /api/files - List recent files.
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.service.list(query.limit).await?;
    Ok(Json(FileListResponse { files }))
}

/// DELETE /api/files/:id - Delete a file.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    state.service.remove(id).await?;

    Ok(Json(MessageResponse::new("File deleted successfully.")))
}
