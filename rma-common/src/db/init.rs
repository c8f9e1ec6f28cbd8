//! Database connection setup
//!
//! The product tables (`<line>_RMA_record`, `<line>_buffer_stock`) are owned
//! by the host application; this module only opens the database and makes
//! sure the `product_lines` registry exists.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every connection
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Open a connection pool to an existing database
///
/// The database file must already exist; a missing file is a connection
/// failure, not a reason to create an empty database.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(false)
        .foreign_keys(true)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Connected to database: {}", redact_url(database_url));

    Ok(pool)
}

/// Connect and ensure the product line registry exists
///
/// Defaults are seeded only when the registry table is created here; an
/// existing registry is left as the operator last edited it, even if empty.
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let pool = connect(database_url).await?;
    if crate::db::product_lines::create_product_lines_table(&pool).await? {
        crate::db::product_lines::initialize_default_product_lines(&pool).await?;
    }
    Ok(pool)
}

/// Strip credentials from a URL before logging it
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
