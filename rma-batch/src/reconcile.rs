//! Upsert reconciliation
//!
//! Writes a sequence of normalized rows into a table keyed by one field.
//! Each row is checked for existence and then updated or inserted, in input
//! order, inside a single transaction per call. Any failure rolls back the
//! whole call.

use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::normalize::NormalizedRow;

/// Inserted/updated tally from one upsert pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}

impl UpsertCounts {
    pub fn total(&self) -> u64 {
        self.inserted + self.updated
    }
}

/// Validate a table name before it is spliced into SQL
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() < 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Quote an SQL identifier, doubling embedded quotes
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL text for one table and column list, built once per call
struct UpsertStatements {
    exists: String,
    /// None when the key is the only column
    update: Option<String>,
    insert: String,
}

impl UpsertStatements {
    fn new(table: &str, columns: &[String], key_index: usize) -> Self {
        let table = quote_ident(table);
        let key = quote_ident(&columns[key_index]);

        let set_clause: Vec<String> = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key_index)
            .map(|(_, c)| format!("{} = ?", quote_ident(c)))
            .collect();

        let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");

        Self {
            exists: format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, key),
            update: (!set_clause.is_empty()).then(|| {
                format!(
                    "UPDATE {} SET {} WHERE {} = ?",
                    table,
                    set_clause.join(", "),
                    key
                )
            }),
            insert: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                column_list.join(", "),
                placeholders
            ),
        }
    }
}

/// Upsert every row into `table`, keyed by `key`.
///
/// The column list of the first row defines the statement shape; every
/// later row must carry the same columns. Rows are written one at a time in
/// input order, so when a key repeats the last row wins. Empty input returns
/// zero counts without opening a transaction.
pub async fn upsert_rows<I>(
    pool: &SqlitePool,
    table: &str,
    key: &str,
    rows: I,
) -> Result<UpsertCounts, IngestError>
where
    I: IntoIterator<Item = NormalizedRow>,
{
    if !is_valid_table_name(table) {
        return Err(IngestError::InvalidTableName(table.to_string()));
    }

    let mut rows = rows.into_iter().peekable();
    let Some(first) = rows.peek() else {
        debug!("No rows for {}, skipping", table);
        return Ok(UpsertCounts::default());
    };

    let columns: Vec<String> = first.columns().to_vec();
    let key_index = columns
        .iter()
        .position(|c| c == key)
        .ok_or_else(|| IngestError::MissingKeyColumn {
            key: key.to_string(),
            available: columns.clone(),
        })?;
    let statements = UpsertStatements::new(table, &columns, key_index);

    let mut tx = pool.begin().await.map_err(|source| IngestError::Transaction {
        table: table.to_string(),
        source,
    })?;

    match apply_rows(&mut tx, table, &statements, &columns, key_index, rows).await {
        Ok(counts) => {
            tx.commit().await.map_err(|source| IngestError::Transaction {
                table: table.to_string(),
                source,
            })?;
            info!(
                "{}: inserted {}, updated {}",
                table, counts.inserted, counts.updated
            );
            Ok(counts)
        }
        Err(e) => {
            warn!("Rolling back {}: {}", table, e);
            if let Err(rollback_err) = tx.rollback().await {
                warn!("Rollback of {} failed: {}", table, rollback_err);
            }
            Err(e)
        }
    }
}

async fn apply_rows<I>(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    statements: &UpsertStatements,
    columns: &[String],
    key_index: usize,
    rows: I,
) -> Result<UpsertCounts, IngestError>
where
    I: Iterator<Item = NormalizedRow>,
{
    let mut counts = UpsertCounts::default();

    for (index, row) in rows.enumerate() {
        let row_number = index + 1;
        if row.columns() != columns {
            return Err(IngestError::SchemaMismatch {
                table: table.to_string(),
                row: row_number,
            });
        }

        let values = row.values();
        let serial = values[key_index].as_str();
        let write_failure = |source: sqlx::Error| IngestError::WriteFailure {
            table: table.to_string(),
            row: row_number,
            serial: serial.to_string(),
            source,
        };

        let existing: i64 = sqlx::query_scalar(&statements.exists)
            .bind(serial)
            .fetch_one(&mut **tx)
            .await
            .map_err(write_failure)?;

        if existing > 0 {
            if let Some(update) = &statements.update {
                let mut query = sqlx::query(update);
                for (i, value) in values.iter().enumerate() {
                    if i != key_index {
                        query = query.bind(value.as_str());
                    }
                }
                query
                    .bind(serial)
                    .execute(&mut **tx)
                    .await
                    .map_err(write_failure)?;
            }
            counts.updated += 1;
        } else {
            let mut query = sqlx::query(&statements.insert);
            for value in values {
                query = query.bind(value.as_str());
            }
            query.execute(&mut **tx).await.map_err(write_failure)?;
            counts.inserted += 1;
        }
    }

    Ok(counts)
}
