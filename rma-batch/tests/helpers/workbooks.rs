//! Spreadsheet fixtures laid out like the real exports

use anyhow::Result;
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// One line of an RMA history export
pub struct RmaRow<'a> {
    pub rma_no: &'a str,
    pub customer: &'a str,
    pub serial: &'a str,
    pub create_date: &'a str,
}

/// One line of a buffer stock export
pub struct StockRow<'a> {
    pub product_name: &'a str,
    pub pn: &'a str,
    pub serial: &'a str,
    pub quantity: f64,
}

/// RMA export: a summary sheet first, history on "TW RMA history"
pub fn write_rma_workbook(path: &Path, rows: &[RmaRow]) -> Result<()> {
    let mut workbook = Workbook::new();

    let summary = workbook.add_worksheet();
    summary.set_name("Summary")?;
    summary.write_string(0, 0, "Total")?;
    summary.write_number(1, 0, rows.len() as f64)?;

    let history = workbook.add_worksheet();
    history.set_name("TW RMA history")?;
    for (col, label) in ["Rma No", "Customer Name", "Serial No (可用掃碼)", "Create Date "]
        .iter()
        .enumerate()
    {
        history.write_string(0, col as u16, *label)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        history.write_string(r, 0, row.rma_no)?;
        history.write_string(r, 1, row.customer)?;
        if !row.serial.is_empty() {
            history.write_string(r, 2, row.serial)?;
        }
        history.write_string(r, 3, row.create_date)?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Buffer stock export: single sheet, with the quantity column the table lacks
pub fn write_stock_workbook(path: &Path, rows: &[StockRow]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, label) in ["Prodcut name", "PN#", "S/N", "Quantity"].iter().enumerate() {
        sheet.write_string(0, col as u16, *label)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, row.product_name)?;
        sheet.write_string(r, 1, row.pn)?;
        sheet.write_string(r, 2, row.serial)?;
        sheet.write_number(r, 3, row.quantity)?;
    }

    workbook.save(path)?;
    Ok(())
}
