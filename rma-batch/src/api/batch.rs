//! Batch execution and product line endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rma_common::db;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::{run_product_line, BatchResult};
use crate::error::ApiResult;
use crate::AppState;

/// POST /api/batch/execute body
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default, rename = "productType", alias = "product_type")]
    pub product_type: Option<String>,
}

/// POST /api/batch/execute
///
/// 200 with the batch result on success, 500 with the same body when any
/// data set failed, 400 when no product line was given.
pub async fn execute_batch(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Response {
    let product_type = request
        .product_type
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();

    if product_type.is_empty() {
        let result = BatchResult::failure("", "productType is required");
        return (StatusCode::BAD_REQUEST, Json(result)).into_response();
    }

    let _guard = state.batch_lock.lock().await;
    info!("Batch execution requested for {}", product_type);
    let result = run_product_line(&state.db, &state.batch_context(), product_type).await;

    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result)).into_response()
}

/// GET /api/batch/product-lines
pub async fn list_product_lines(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(db::list_product_line_names(&state.db).await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitProductLinesResponse {
    pub success: bool,
    pub message: String,
    pub product_lines: Vec<String>,
    pub count: usize,
}

/// POST /api/batch/init-product-lines
///
/// Seeds the default product lines if the registry is empty.
pub async fn init_product_lines(
    State(state): State<AppState>,
) -> ApiResult<Json<InitProductLinesResponse>> {
    let seeded = db::initialize_default_product_lines(&state.db).await?;
    let product_lines = db::list_product_line_names(&state.db).await?;

    Ok(Json(InitProductLinesResponse {
        success: true,
        message: if seeded {
            "Default product lines initialized".to_string()
        } else {
            "Product lines already initialized".to_string()
        },
        count: product_lines.len(),
        product_lines,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateProductLineResponse {
    pub valid: bool,
    pub message: String,
    pub product_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_product_lines: Option<Vec<String>>,
}

/// GET /api/batch/validate-product-line/:product_type
pub async fn validate_product_line(
    State(state): State<AppState>,
    Path(product_type): Path<String>,
) -> ApiResult<Json<ValidateProductLineResponse>> {
    let valid = db::is_valid_product_line_name(&product_type)
        && db::is_registered_product_line(&state.db, &product_type).await?;

    let response = if valid {
        ValidateProductLineResponse {
            valid,
            message: "Product line is valid".to_string(),
            product_type,
            available_product_lines: None,
        }
    } else {
        ValidateProductLineResponse {
            valid,
            message: "Invalid product line".to_string(),
            product_type,
            available_product_lines: Some(db::list_product_line_names(&state.db).await?),
        }
    };

    Ok(Json(response))
}

/// Build batch routes
pub fn batch_routes() -> Router<AppState> {
    Router::new()
        .route("/api/batch/execute", post(execute_batch))
        .route("/api/batch/product-lines", get(list_product_lines))
        .route("/api/batch/init-product-lines", post(init_product_lines))
        .route(
            "/api/batch/validate-product-line/:product_type",
            get(validate_product_line),
        )
}
