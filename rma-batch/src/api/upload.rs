//! Spreadsheet upload into the data folder
//!
//! Only stores, lists and deletes `.xlsx`/`.xls` files; ingestion happens
//! through the batch endpoint.

use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub filename: String,
    pub file_size: usize,
    pub file_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    pub success: bool,
    pub message: String,
    pub files: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

fn is_excel_file_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}

/// Accept a bare Excel file name; reject anything that could leave the data folder
fn checked_file_name(name: &str) -> ApiResult<&str> {
    if name.is_empty() || name.contains(|c: char| c == '/' || c == '\\') || name.starts_with('.') {
        return Err(ApiError::BadRequest(format!("Invalid file name: {}", name)));
    }
    if !is_excel_file_name(name) {
        return Err(ApiError::BadRequest(
            "Only Excel files (.xlsx or .xls) are allowed".to_string(),
        ));
    }
    Ok(name)
}

/// POST /api/upload/file (multipart field `file`)
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        checked_file_name(&filename)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;
        if data.is_empty() {
            return Err(ApiError::BadRequest("File must not be empty".to_string()));
        }

        tokio::fs::create_dir_all(&state.data_dir).await?;
        let target = state.data_dir.join(&filename);
        tokio::fs::write(&target, &data).await?;
        info!("Stored upload {} ({} bytes)", target.display(), data.len());

        return Ok(Json(UploadResponse {
            success: true,
            message: "File uploaded".to_string(),
            filename,
            file_size: data.len(),
            file_path: target.display().to_string(),
        }));
    }

    Err(ApiError::BadRequest("Missing multipart field 'file'".to_string()))
}

/// GET /api/upload/files
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FileListResponse>> {
    if !state.data_dir.exists() {
        return Ok(Json(FileListResponse {
            success: true,
            message: "Data folder does not exist".to_string(),
            files: Vec::new(),
            count: 0,
        }));
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(&state.data_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if is_excel_file_name(&name) {
            files.push(name);
        }
    }
    files.sort();

    Ok(Json(FileListResponse {
        success: true,
        message: "File list retrieved".to_string(),
        count: files.len(),
        files,
    }))
}

/// DELETE /api/upload/files/:filename
pub async fn delete_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let name = checked_file_name(&filename)?;
    let target = state.data_dir.join(name);

    if !target.is_file() {
        return Err(ApiError::BadRequest(format!("File does not exist: {}", name)));
    }

    tokio::fs::remove_file(&target).await?;
    info!("Deleted {}", target.display());

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Deleted {}", name),
    }))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload/file", post(upload_file))
        .route("/api/upload/files", get(list_files))
        .route("/api/upload/files/:filename", delete(delete_file))
}
