//! Data-set kinds and their column maps
//!
//! Column renames are plain configuration data: source label → canonical
//! field. Labels are matched exactly, trailing spaces included, because
//! that is how they appear in the exports.

use rma_common::config::FieldOverrides;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Key field every normalized row must carry
pub const KEY_FIELD: &str = "Serial_No";

/// Sheet holding RMA history in the multi-sheet RMA exports
pub const RMA_HISTORY_SHEET: &str = "TW RMA history";

const RMA_HISTORY_FIELDS: &[(&str, &str)] = &[
    ("Rma No", "Rma_No"),
    ("Customer Name", "Customer_Name"),
    ("Serial No (可用掃碼)", "Serial_No"),
    ("Part No(可用掃碼)", "PN"),
    ("SKU#(可用掃碼)", "SKU"),
    ("Product Name", "Product_Name"),
    ("Sell/Ship Date", "Sell_Ship_Date"),
    ("Create Date ", "Create_Date"),
    ("Return Date", "Return_Date"),
    ("Failure desc", "Failure_desc"),
    ("VI Damage Status", "VI_Damage_Status"),
    ("Test Result Desc", "Test_Result_Desc"),
    ("Replacement SN in TW(可用掃碼)", "Replacement_SN_in_TW"),
    ("Replacement PN in TW(可用掃碼)", "Replacement_PN_in_TW"),
    ("Replacement SKU# in TW(可用掃碼)", "Replacement_SKU_in_TW"),
    ("Replacement SN from HK", "Replacement_SN_from_HK"),
    ("Replacement PN from HK", "Replacement_PN_from_HK"),
    ("Replacement SKU# from HK", "Replacement_SKU_from_HK"),
    ("RMA board Test Result", "RMA_board_Test_Result"),
    ("End user invoice date ", "End_user_invoice_date"),
    ("Warranty Until ", "Warranty_Until"),
    (" Remark", "Remark"),
];

const BUFFER_STOCK_FIELDS: &[(&str, &str)] = &[
    ("Prodcut name", "Prodcut_name"),
    ("PN#", "PN"),
    ("SKU#", "SKU"),
    ("S/N", "Serial_No"),
];

/// Stock snapshots carry a quantity column the stock table does not have
const BUFFER_STOCK_DROPPED: &[&str] = &["Quantity"];

/// The two data sets ingested per product line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSetKind {
    RmaHistory,
    BufferStock,
}

impl DataSetKind {
    /// Short label used in summary messages
    pub fn label(&self) -> &'static str {
        match self {
            DataSetKind::RmaHistory => "RMA",
            DataSetKind::BufferStock => "Stock",
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            DataSetKind::RmaHistory => "RMA_record",
            DataSetKind::BufferStock => "buffer_stock",
        }
    }

    /// Export file name for a product line, e.g. `VGA_RMA_record.xlsx`
    pub fn file_name(&self, product_line: &str) -> String {
        format!("{}_{}.xlsx", product_line, self.suffix())
    }

    /// Target table for a product line, e.g. `VGA_buffer_stock`
    pub fn table_name(&self, product_line: &str) -> String {
        format!("{}_{}", product_line, self.suffix())
    }

    pub fn preferred_sheet(&self) -> Option<&'static str> {
        match self {
            DataSetKind::RmaHistory => Some(RMA_HISTORY_SHEET),
            DataSetKind::BufferStock => None,
        }
    }
}

/// Source label → canonical field renames plus columns to discard
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    renames: HashMap<String, String>,
    dropped: HashSet<String>,
}

impl FieldMap {
    /// Empty map: every column passes through unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in map for a data-set kind
    pub fn for_kind(kind: DataSetKind) -> Self {
        let (renames, dropped) = match kind {
            DataSetKind::RmaHistory => (RMA_HISTORY_FIELDS, &[][..]),
            DataSetKind::BufferStock => (BUFFER_STOCK_FIELDS, BUFFER_STOCK_DROPPED),
        };

        let map = renames
            .iter()
            .fold(Self::new(), |map, (from, to)| map.rename(*from, *to));
        dropped.iter().fold(map, |map, label| map.drop_column(*label))
    }

    /// Built-in map for a kind with configured renames layered on top
    pub fn configured(kind: DataSetKind, overrides: &FieldOverrides) -> Self {
        let extra = match kind {
            DataSetKind::RmaHistory => &overrides.rma,
            DataSetKind::BufferStock => &overrides.stock,
        };
        Self::for_kind(kind).with_overrides(extra)
    }

    pub fn with_overrides(self, overrides: &BTreeMap<String, String>) -> Self {
        overrides
            .iter()
            .fold(self, |map, (from, to)| map.rename(from.as_str(), to.as_str()))
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.renames.insert(from.into(), to.into());
        self
    }

    /// Discard a column; matched against the canonical (renamed) name
    pub fn drop_column(mut self, field: impl Into<String>) -> Self {
        self.dropped.insert(field.into());
        self
    }

    /// Canonical name for a source label; unmapped labels pass through
    pub fn canonical<'a>(&'a self, label: &'a str) -> &'a str {
        self.renames.get(label).map(String::as_str).unwrap_or(label)
    }

    pub fn is_dropped(&self, field: &str) -> bool {
        self.dropped.contains(field)
    }
}
