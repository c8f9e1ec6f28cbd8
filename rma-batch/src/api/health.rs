//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Registered product lines; absent when the registry cannot be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_line_count: Option<i64>,
}

/// GET /health
///
/// Reports "degraded" instead of failing when the database is unreachable.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let count = rma_common::db::count_product_lines(&state.db).await.ok();

    Json(HealthResponse {
        status: if count.is_some() { "ok" } else { "degraded" }.to_string(),
        module: "rma-batch".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        product_line_count: count,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
