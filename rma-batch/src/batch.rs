//! Batch orchestration for one product line
//!
//! Loads the RMA history and buffer stock exports, normalizes them and
//! upserts each into its table. The two data sets are independent: each
//! runs in its own transaction and a failure in one is reported without
//! touching the other.

use rma_common::config::FieldOverrides;
use rma_common::db;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::IngestError;
use crate::fields::{DataSetKind, FieldMap, KEY_FIELD};
use crate::normalize::normalize;
use crate::reconcile::{upsert_rows, UpsertCounts};
use crate::source::read_workbook;

/// Per-data-set summary in a batch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub inserted: u64,
    pub updated: u64,
    pub total: u64,
    pub message: String,
}

impl BatchStats {
    fn from_outcome(kind: DataSetKind, outcome: &Result<UpsertCounts, IngestError>) -> Self {
        match outcome {
            Ok(counts) => Self {
                inserted: counts.inserted,
                updated: counts.updated,
                total: counts.total(),
                message: format!(
                    "{}: inserted {}, updated {}",
                    kind.label(),
                    counts.inserted,
                    counts.updated
                ),
            },
            Err(e) => Self {
                inserted: 0,
                updated: 0,
                total: 0,
                message: format!("{}: {}", kind.label(), e),
            },
        }
    }
}

/// Result of one batch invocation, as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub success: bool,
    pub message: String,
    pub product_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rma_stats: Option<BatchStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_stats: Option<BatchStats>,
}

impl BatchResult {
    /// Failure before any data set was attempted
    pub fn failure(product_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            product_type: product_type.into(),
            rma_stats: None,
            stock_stats: None,
        }
    }

    /// Process exit code for CLI use: 0 on success, 1 otherwise
    pub fn exit_code(&self) -> u8 {
        if self.success {
            0
        } else {
            1
        }
    }
}

/// Where a batch reads from and how it maps columns
#[derive(Debug, Clone)]
pub struct BatchContext {
    pub data_dir: PathBuf,
    pub fields: FieldOverrides,
}

impl BatchContext {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            fields: FieldOverrides::default(),
        }
    }

    pub fn with_fields(mut self, fields: FieldOverrides) -> Self {
        self.fields = fields;
        self
    }
}

/// Check a product line is well-formed and registered
pub async fn validate_product_line(pool: &SqlitePool, product_line: &str) -> Result<(), IngestError> {
    let registered = db::is_valid_product_line_name(product_line)
        && db::is_registered_product_line(pool, product_line).await?;

    if registered {
        Ok(())
    } else {
        Err(IngestError::UnknownProductLine {
            name: product_line.to_string(),
            available: db::list_product_line_names(pool).await?,
        })
    }
}

/// Read, normalize and upsert one data set
pub async fn ingest_data_set(
    pool: &SqlitePool,
    ctx: &BatchContext,
    product_line: &str,
    kind: DataSetKind,
) -> Result<UpsertCounts, IngestError> {
    let path = ctx.data_dir.join(kind.file_name(product_line));
    let table = load_source(&path, kind.preferred_sheet()).await?;
    info!(
        "{} {}: read {} rows from {}",
        product_line,
        kind.label(),
        table.len(),
        path.display()
    );

    let fields = FieldMap::configured(kind, &ctx.fields);
    let mut rows = normalize(table, &fields, KEY_FIELD)?;
    let counts = upsert_rows(pool, &kind.table_name(product_line), KEY_FIELD, rows.by_ref()).await?;

    if rows.skipped() > 0 {
        info!(
            "{} {}: skipped {} rows with empty {}",
            product_line,
            kind.label(),
            rows.skipped(),
            KEY_FIELD
        );
    }

    Ok(counts)
}

/// Workbook parsing is blocking; keep it off the async worker threads
async fn load_source(
    path: &Path,
    sheet: Option<&'static str>,
) -> Result<crate::source::RawTable, IngestError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_workbook(&path, sheet))
        .await
        .map_err(|e| IngestError::SourceRead(format!("Reader task failed: {}", e)))?
}

/// Run both data sets for a product line against an open pool
pub async fn run_product_line(pool: &SqlitePool, ctx: &BatchContext, product_line: &str) -> BatchResult {
    if let Err(e) = validate_product_line(pool, product_line).await {
        warn!("Rejected product line {}: {}", product_line, e);
        return BatchResult::failure(product_line, e.to_string());
    }

    info!("Processing product line {}", product_line);

    let rma = ingest_data_set(pool, ctx, product_line, DataSetKind::RmaHistory).await;
    if let Err(e) = &rma {
        warn!("{} RMA: {}", product_line, e);
    }

    let stock = ingest_data_set(pool, ctx, product_line, DataSetKind::BufferStock).await;
    if let Err(e) = &stock {
        warn!("{} Stock: {}", product_line, e);
    }

    summarize(product_line, rma, stock)
}

fn summarize(
    product_line: &str,
    rma: Result<UpsertCounts, IngestError>,
    stock: Result<UpsertCounts, IngestError>,
) -> BatchResult {
    let success = rma.is_ok() && stock.is_ok();
    let no_sources = matches!((&rma, &stock), (Err(a), Err(b)) if a.is_source_missing() && b.is_source_missing());

    let message = if success {
        format!("{} product line processed", product_line)
    } else if no_sources {
        format!("{} product line has no source files", product_line)
    } else {
        format!("{} product line completed with errors", product_line)
    };

    BatchResult {
        success,
        message,
        product_type: product_line.to_string(),
        rma_stats: Some(BatchStats::from_outcome(DataSetKind::RmaHistory, &rma)),
        stock_stats: Some(BatchStats::from_outcome(DataSetKind::BufferStock, &stock)),
    }
}

/// One-shot batch: connect, run, close
///
/// Connection failure aborts the whole invocation with a failure result.
pub async fn execute_batch(database_url: &str, ctx: &BatchContext, product_line: &str) -> BatchResult {
    let pool = match db::init_database(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            let e = IngestError::Connection(e.to_string());
            error!("{}", e);
            return BatchResult::failure(product_line, e.to_string());
        }
    };

    let result = run_product_line(&pool, ctx, product_line).await;
    pool.close().await;
    result
}
