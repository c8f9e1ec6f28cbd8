//! rma-batch library - RMA and buffer stock spreadsheet ingest
//!
//! Normalizes per-product-line spreadsheet exports and upserts them into
//! `<line>_RMA_record` / `<line>_buffer_stock`, keyed by serial number.
//! Driven either as a one-shot CLI job or through the HTTP API.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use rma_common::config::FieldOverrides;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod batch;
pub mod error;
pub mod fields;
pub mod normalize;
pub mod reconcile;
pub mod source;

pub use crate::batch::{BatchContext, BatchResult, BatchStats};
pub use crate::error::{ApiError, ApiResult, IngestError};

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Folder holding the spreadsheet exports
    pub data_dir: PathBuf,
    /// Configured column renames
    pub fields: FieldOverrides,
    /// Held for the duration of a batch so only one reconciliation runs at a time
    pub batch_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: SqlitePool, data_dir: PathBuf) -> Self {
        Self {
            db,
            data_dir,
            fields: FieldOverrides::default(),
            batch_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_fields(mut self, fields: FieldOverrides) -> Self {
        self.fields = fields;
        self
    }

    pub fn batch_context(&self) -> BatchContext {
        BatchContext::new(self.data_dir.clone()).with_fields(self.fields.clone())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::batch_routes())
        .merge(api::upload_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
