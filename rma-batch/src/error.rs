//! Error types for rma-batch
//!
//! `IngestError` covers one data set's path from spreadsheet to table.
//! `ApiError` maps failures onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while ingesting one data set
#[derive(Debug, Error)]
pub enum IngestError {
    /// Expected spreadsheet export is absent
    #[error("File not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Spreadsheet exists but could not be read
    #[error("Failed to read spreadsheet: {0}")]
    SourceRead(String),

    /// Key field is not among the normalized columns
    #[error("Column '{key}' not found, available columns: {available:?}")]
    MissingKeyColumn { key: String, available: Vec<String> },

    /// A row's existence check, insert or update failed; the data set was rolled back
    #[error("Write to {table} failed at row {row} (Serial_No '{serial}'): {source}")]
    WriteFailure {
        table: String,
        row: usize,
        serial: String,
        #[source]
        source: sqlx::Error,
    },

    /// A row carried a different column list than the first row
    #[error("Row {row} for {table} has a different column set than the first row")]
    SchemaMismatch { table: String, row: usize },

    /// Opening or committing the data set's transaction failed
    #[error("Transaction on {table} failed: {source}")]
    Transaction {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Target table name contains characters outside [A-Za-z0-9_-]
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    /// Product line is not registered
    #[error("Invalid product line: {name}, available product lines: {available:?}")]
    UnknownProductLine { name: String, available: Vec<String> },

    /// Database session could not be established
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// rma-common error (registry lookups)
    #[error(transparent)]
    Common(#[from] rma_common::Error),
}

impl IngestError {
    /// True for errors that mean the source file is simply not there
    pub fn is_source_missing(&self) -> bool {
        matches!(self, IngestError::SourceNotFound(_))
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// rma-common error
    #[error("Common error: {0}")]
    Common(#[from] rma_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Common(rma_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(rma_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
