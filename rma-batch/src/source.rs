//! Spreadsheet source reading
//!
//! Loads one worksheet of an `.xlsx`/`.xls` export into a [`RawTable`]: the
//! first row of the used range is the header, every following row is data.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::error::IngestError;

/// One spreadsheet cell with its source type preserved
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

/// Header labels plus data rows, each row as wide as the header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table, padding or truncating rows to the header width
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a worksheet from a workbook on disk.
///
/// Uses `preferred_sheet` when the workbook has a sheet of that name,
/// otherwise the first sheet.
pub fn read_workbook(path: &Path, preferred_sheet: Option<&str>) -> Result<RawTable, IngestError> {
    if !path.exists() {
        return Err(IngestError::SourceNotFound(path.to_path_buf()));
    }

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| IngestError::SourceRead(format!("{}: {}", path.display(), e)))?;

    let sheet_names = workbook.sheet_names();
    debug!("{} sheets: {:?}", path.display(), sheet_names);

    let sheet = match preferred_sheet {
        Some(name) if sheet_names.iter().any(|s| s == name) => name.to_string(),
        _ => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| IngestError::SourceRead(format!("{} has no sheets", path.display())))?,
    };

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| IngestError::SourceRead(format!("{} [{}]: {}", path.display(), sheet, e)))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(RawTable::default());
    };

    let columns = header_labels(header);
    let data = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    let table = RawTable::new(columns, data);
    debug!(
        "Read {} rows x {} columns from {} [{}]",
        table.len(),
        table.columns.len(),
        path.display(),
        sheet
    );
    Ok(table)
}

/// Render header cells as labels.
///
/// Blank headers become `Unnamed: <index>`; repeated labels get a `.1`, `.2`
/// suffix so every column name is unique.
fn header_labels(header: &[Data]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    header
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let label = match cell {
                Data::Empty => format!("Unnamed: {}", index),
                Data::String(s) if s.is_empty() => format!("Unnamed: {}", index),
                Data::String(s) => s.clone(),
                other => other.to_string(),
            };

            let count = seen.entry(label.clone()).or_insert(0);
            let unique = if *count == 0 {
                label
            } else {
                format!("{}.{}", label, count)
            };
            *count += 1;
            unique
        })
        .collect()
}

/// Excel 1900-system serial date to a timestamp, rounded to the millisecond
fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Serials below 60 predate Excel's phantom 1900-02-29
    let serial = if serial < 60.0 { serial + 1.0 } else { serial };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if dt.is_duration() => Cell::Float(dt.as_f64()),
        Data::DateTime(dt) => match excel_serial_to_datetime(dt.as_f64()) {
            Some(value) => Cell::DateTime(value),
            None => Cell::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}
