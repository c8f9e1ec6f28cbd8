//! Row normalization
//!
//! Turns a [`RawTable`] into [`NormalizedRow`]s: canonical column names,
//! every value as text, and only rows with a non-empty key.

use std::sync::Arc;
use tracing::warn;

use crate::error::IngestError;
use crate::fields::FieldMap;
use crate::source::{Cell, RawTable};

/// A row with canonical field names and all-text values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl NormalizedRow {
    /// Build a row from (field, value) pairs in column order
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let (columns, values): (Vec<String>, Vec<String>) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self {
            columns: columns.into(),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == field)
            .map(|i| self.values[i].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }
}

/// Lazy sequence of normalized rows over one raw table
///
/// Rows whose key is empty are skipped and counted.
#[derive(Debug)]
pub struct NormalizedRows {
    columns: Arc<[String]>,
    /// Source column index for each output column
    sources: Vec<usize>,
    key_index: usize,
    raw: std::vec::IntoIter<Vec<Cell>>,
    skipped: usize,
}

impl NormalizedRows {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn key_field(&self) -> &str {
        &self.columns[self.key_index]
    }

    /// Rows dropped so far for an empty key
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for NormalizedRows {
    type Item = NormalizedRow;

    fn next(&mut self) -> Option<NormalizedRow> {
        loop {
            let raw = self.raw.next()?;
            let values: Vec<String> = self.sources.iter().map(|&i| coerce(&raw[i])).collect();

            // Whitespace-only keys count as empty; other keys are kept as written
            if values[self.key_index].trim().is_empty() {
                self.skipped += 1;
                continue;
            }

            return Some(NormalizedRow {
                columns: Arc::clone(&self.columns),
                values,
            });
        }
    }
}

/// Normalize a raw table against a field map.
///
/// Fails with [`IngestError::MissingKeyColumn`] when no column maps to `key`.
pub fn normalize(table: RawTable, fields: &FieldMap, key: &str) -> Result<NormalizedRows, IngestError> {
    let mut columns: Vec<String> = Vec::new();
    let mut sources: Vec<usize> = Vec::new();

    for (index, label) in table.columns.iter().enumerate() {
        let canonical = fields.canonical(label);
        if fields.is_dropped(canonical) {
            continue;
        }
        if columns.iter().any(|c| c == canonical) {
            warn!(
                "Column '{}' maps to '{}' which is already present; ignoring it",
                label, canonical
            );
            continue;
        }
        columns.push(canonical.to_string());
        sources.push(index);
    }

    let key_index = columns
        .iter()
        .position(|c| c == key)
        .ok_or_else(|| IngestError::MissingKeyColumn {
            key: key.to_string(),
            available: columns.clone(),
        })?;

    Ok(NormalizedRows {
        columns: columns.into(),
        sources,
        key_index,
        raw: table.rows.into_iter(),
        skipped: 0,
    })
}

/// Render a cell as text; missing values become the empty string
fn coerce(cell: &Cell) -> String {
    match cell {
        Cell::Empty => String::new(),
        Cell::Text(s) if s == "nan" => String::new(),
        Cell::Text(s) => s.clone(),
        Cell::Int(i) => i.to_string(),
        Cell::Float(f) if f.is_nan() => String::new(),
        Cell::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Cell::Float(f) => f.to_string(),
        Cell::Bool(true) => "True".to_string(),
        Cell::Bool(false) => "False".to_string(),
        Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}
