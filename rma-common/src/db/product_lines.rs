//! Product line registry
//!
//! A product line names a partition of source files and target tables
//! (`<line>_RMA_record`, `<line>_buffer_stock`). Valid lines are stored in
//! the `product_lines` table.

use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

/// Product lines seeded into an empty registry
pub const DEFAULT_PRODUCT_LINES: [&str; 3] = ["VGA", "MB", "MiniPC"];

/// Check a product line name is usable as a file and table name fragment
///
/// Only ASCII alphanumerics, underscore and hyphen are allowed.
pub fn is_valid_product_line_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() < 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Create the `product_lines` table if it does not exist
///
/// Returns true when the table was created by this call.
pub async fn create_product_lines_table(pool: &SqlitePool) -> Result<bool> {
    let existing: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'product_lines'",
    )
    .fetch_one(pool)
    .await?;

    if existing > 0 {
        return Ok(false);
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS product_lines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_line TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    info!("Created product_lines table");
    Ok(true)
}

/// Seed the default product lines when the registry is empty
///
/// Returns true if the defaults were inserted.
pub async fn initialize_default_product_lines(pool: &SqlitePool) -> Result<bool> {
    if count_product_lines(pool).await? > 0 {
        return Ok(false);
    }

    for name in DEFAULT_PRODUCT_LINES {
        sqlx::query("INSERT INTO product_lines (product_line) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    info!(
        "Initialized default product lines: {}",
        DEFAULT_PRODUCT_LINES.join(", ")
    );
    Ok(true)
}

/// All registered product line names, in registration order
pub async fn list_product_line_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let names = sqlx::query_scalar::<_, String>(
        "SELECT product_line FROM product_lines ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(names)
}

pub async fn is_registered_product_line(pool: &SqlitePool, name: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM product_lines WHERE product_line = ?")
            .bind(name)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

pub async fn count_product_lines(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_lines")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Register a new product line
pub async fn add_product_line(pool: &SqlitePool, name: &str) -> Result<()> {
    if !is_valid_product_line_name(name) {
        return Err(Error::InvalidInput(format!(
            "Product line name '{}' may only contain letters, digits, '_' and '-'",
            name
        )));
    }

    if is_registered_product_line(pool, name).await? {
        return Err(Error::InvalidInput(format!(
            "Product line '{}' is already registered",
            name
        )));
    }

    sqlx::query("INSERT INTO product_lines (product_line) VALUES (?)")
        .bind(name)
        .execute(pool)
        .await?;

    info!("Registered product line {}", name);
    Ok(())
}

/// Remove a product line from the registry (its tables are left untouched)
pub async fn remove_product_line(pool: &SqlitePool, name: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM product_lines WHERE product_line = ?")
        .bind(name)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Product line '{}'", name)));
    }

    info!("Removed product line {}", name);
    Ok(())
}
