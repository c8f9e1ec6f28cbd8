//! Database Test Utilities
//!
//! A temp folder holding a file database with the VGA product tables
//! created, plus an empty data folder for the spreadsheet exports.

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;

/// Temp database and data folder; keep it alive for the duration of a test
pub struct TestEnv {
    pub dir: TempDir,
    pub database_url: String,
    pub data_dir: PathBuf,
    pub pool: SqlitePool,
}

const RMA_TABLE_COLUMNS: &[&str] = &[
    "Rma_No",
    "Customer_Name",
    "PN",
    "SKU",
    "Product_Name",
    "Sell_Ship_Date",
    "Create_Date",
    "Return_Date",
    "Failure_desc",
    "Remark",
];

const STOCK_TABLE_COLUMNS: &[&str] = &["Prodcut_name", "PN", "SKU"];

/// Create the database file, registry and `<line>` product tables
pub async fn create_test_env(product_line: &str) -> Result<TestEnv> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("rma_test.db");
    std::fs::File::create(&db_path)?;

    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir)?;

    let database_url = format!("sqlite://{}", db_path.display());
    let pool = rma_common::db::init_database(&database_url).await?;

    create_product_table(&pool, &format!("{}_RMA_record", product_line), RMA_TABLE_COLUMNS)
        .await?;
    create_product_table(&pool, &format!("{}_buffer_stock", product_line), STOCK_TABLE_COLUMNS)
        .await?;

    Ok(TestEnv {
        dir,
        database_url,
        data_dir,
        pool,
    })
}

async fn create_product_table(pool: &SqlitePool, table: &str, columns: &[&str]) -> Result<()> {
    let mut defs = vec!["\"Serial_No\" TEXT NOT NULL".to_string()];
    defs.extend(columns.iter().map(|c| format!("\"{}\" TEXT", c)));
    let sql = format!("CREATE TABLE \"{}\" ({})", table, defs.join(", "));
    sqlx::query(&sql).execute(pool).await?;
    Ok(())
}

/// Number of rows in a table
pub async fn count_rows(pool: &SqlitePool, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table);
    Ok(sqlx::query_scalar(&sql).fetch_one(pool).await?)
}

/// One column of the record with the given serial, if present
pub async fn fetch_record(
    pool: &SqlitePool,
    table: &str,
    serial: &str,
    column: &str,
) -> Result<Option<String>> {
    let sql = format!(
        "SELECT \"{}\" FROM \"{}\" WHERE \"Serial_No\" = ?",
        column, table
    );
    Ok(sqlx::query_scalar::<_, Option<String>>(&sql)
        .bind(serial)
        .fetch_optional(pool)
        .await?
        .flatten())
}
