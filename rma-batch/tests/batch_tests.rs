//! Integration tests for one-shot batch execution
//!
//! Runs the full read → normalize → upsert path against a temp file
//! database and generated workbooks.

mod helpers;

use helpers::{
    count_rows, create_test_env, fetch_record, write_rma_workbook, write_stock_workbook, RmaRow,
    StockRow,
};
use rma_batch::batch::execute_batch;
use rma_batch::BatchContext;
use rma_common::config::FieldOverrides;

fn rma(rma_no: &'static str, customer: &'static str, serial: &'static str) -> RmaRow<'static> {
    RmaRow {
        rma_no,
        customer,
        serial,
        create_date: "2024-03-01",
    }
}

fn stock(serial: &'static str, quantity: f64) -> StockRow<'static> {
    StockRow {
        product_name: "RTX 4060",
        pn: "PN-4060",
        serial,
        quantity,
    }
}

#[tokio::test]
async fn test_both_data_sets_inserted() {
    let env = create_test_env("VGA").await.unwrap();
    write_rma_workbook(
        &env.data_dir.join("VGA_RMA_record.xlsx"),
        &[rma("R-1", "Acme", "SN-1"), rma("R-2", "Globex", "SN-2")],
    )
    .unwrap();
    write_stock_workbook(
        &env.data_dir.join("VGA_buffer_stock.xlsx"),
        &[stock("BS-1", 1.0), stock("BS-2", 3.0), stock("BS-3", 1.0)],
    )
    .unwrap();

    let ctx = BatchContext::new(env.data_dir.clone());
    let result = execute_batch(&env.database_url, &ctx, "VGA").await;

    assert!(result.success, "{:?}", result);
    assert_eq!(result.exit_code(), 0);
    assert_eq!(result.product_type, "VGA");
    assert_eq!(result.message, "VGA product line processed");

    let rma_stats = result.rma_stats.unwrap();
    assert_eq!((rma_stats.inserted, rma_stats.updated, rma_stats.total), (2, 0, 2));
    let stock_stats = result.stock_stats.unwrap();
    assert_eq!((stock_stats.inserted, stock_stats.updated), (3, 0));

    assert_eq!(count_rows(&env.pool, "VGA_RMA_record").await.unwrap(), 2);
    assert_eq!(count_rows(&env.pool, "VGA_buffer_stock").await.unwrap(), 3);
    assert_eq!(
        fetch_record(&env.pool, "VGA_RMA_record", "SN-2", "Customer_Name")
            .await
            .unwrap()
            .as_deref(),
        Some("Globex")
    );
    assert_eq!(
        fetch_record(&env.pool, "VGA_RMA_record", "SN-1", "Create_Date")
            .await
            .unwrap()
            .as_deref(),
        Some("2024-03-01")
    );
}

#[tokio::test]
async fn test_rerun_updates_instead_of_inserting() {
    let env = create_test_env("VGA").await.unwrap();
    let rma_path = env.data_dir.join("VGA_RMA_record.xlsx");
    write_rma_workbook(&rma_path, &[rma("R-1", "Acme", "SN-1"), rma("R-2", "Globex", "SN-2")])
        .unwrap();
    write_stock_workbook(&env.data_dir.join("VGA_buffer_stock.xlsx"), &[stock("BS-1", 1.0)])
        .unwrap();

    let ctx = BatchContext::new(env.data_dir.clone());
    assert!(execute_batch(&env.database_url, &ctx, "VGA").await.success);

    // Same serials with new content, plus one new serial
    write_rma_workbook(
        &rma_path,
        &[
            rma("R-1", "Acme Europe", "SN-1"),
            rma("R-2", "Globex", "SN-2"),
            rma("R-3", "Initech", "SN-3"),
        ],
    )
    .unwrap();

    let result = execute_batch(&env.database_url, &ctx, "VGA").await;
    assert!(result.success);
    let rma_stats = result.rma_stats.unwrap();
    assert_eq!((rma_stats.inserted, rma_stats.updated), (1, 2));
    let stock_stats = result.stock_stats.unwrap();
    assert_eq!((stock_stats.inserted, stock_stats.updated), (0, 1));

    assert_eq!(count_rows(&env.pool, "VGA_RMA_record").await.unwrap(), 3);
    assert_eq!(count_rows(&env.pool, "VGA_buffer_stock").await.unwrap(), 1);
    assert_eq!(
        fetch_record(&env.pool, "VGA_RMA_record", "SN-1", "Customer_Name")
            .await
            .unwrap()
            .as_deref(),
        Some("Acme Europe")
    );
}

#[tokio::test]
async fn test_rows_without_serial_are_skipped() {
    let env = create_test_env("VGA").await.unwrap();
    write_rma_workbook(
        &env.data_dir.join("VGA_RMA_record.xlsx"),
        &[
            rma("R-1", "Acme", "SN-1"),
            rma("R-2", "Nobody", ""),
            rma("R-3", "Initech", "SN-3"),
        ],
    )
    .unwrap();
    write_stock_workbook(&env.data_dir.join("VGA_buffer_stock.xlsx"), &[]).unwrap();

    let ctx = BatchContext::new(env.data_dir.clone());
    let result = execute_batch(&env.database_url, &ctx, "VGA").await;

    assert!(result.success, "{:?}", result);
    assert_eq!(result.rma_stats.unwrap().inserted, 2);
    assert_eq!(result.stock_stats.unwrap().total, 0);

    assert_eq!(count_rows(&env.pool, "VGA_RMA_record").await.unwrap(), 2);
    let blank: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM \"VGA_RMA_record\" WHERE \"Serial_No\" = '' OR \"Customer_Name\" = 'Nobody'",
    )
    .fetch_one(&env.pool)
    .await
    .unwrap();
    assert_eq!(blank, 0);
}

#[tokio::test]
async fn test_missing_stock_file_reports_failure_but_keeps_rma() {
    let env = create_test_env("VGA").await.unwrap();
    write_rma_workbook(
        &env.data_dir.join("VGA_RMA_record.xlsx"),
        &[rma("R-1", "Acme", "SN-1")],
    )
    .unwrap();

    let ctx = BatchContext::new(env.data_dir.clone());
    let result = execute_batch(&env.database_url, &ctx, "VGA").await;

    assert!(!result.success);
    assert_eq!(result.exit_code(), 1);
    assert_eq!(result.message, "VGA product line completed with errors");

    let rma_stats = result.rma_stats.unwrap();
    assert_eq!(rma_stats.inserted, 1);
    let stock_stats = result.stock_stats.unwrap();
    assert_eq!(stock_stats.total, 0);
    assert!(stock_stats.message.contains("File not found"), "{}", stock_stats.message);

    // The RMA data set committed independently
    assert_eq!(count_rows(&env.pool, "VGA_RMA_record").await.unwrap(), 1);
}

#[tokio::test]
async fn test_no_source_files() {
    let env = create_test_env("VGA").await.unwrap();

    let ctx = BatchContext::new(env.data_dir.clone());
    let result = execute_batch(&env.database_url, &ctx, "VGA").await;

    assert!(!result.success);
    assert_eq!(result.message, "VGA product line has no source files");
}

#[tokio::test]
async fn test_missing_table_rolls_back_only_that_data_set() {
    // Registered product line whose tables were never created
    let env = create_test_env("VGA").await.unwrap();
    write_rma_workbook(
        &env.data_dir.join("MB_RMA_record.xlsx"),
        &[rma("R-1", "Acme", "SN-1")],
    )
    .unwrap();
    write_stock_workbook(&env.data_dir.join("MB_buffer_stock.xlsx"), &[stock("BS-1", 1.0)])
        .unwrap();

    let ctx = BatchContext::new(env.data_dir.clone());
    let result = execute_batch(&env.database_url, &ctx, "MB").await;

    assert!(!result.success);
    assert!(result.rma_stats.unwrap().message.starts_with("RMA: Write to MB_RMA_record failed"));
    assert!(result.stock_stats.unwrap().message.starts_with("Stock: Write to MB_buffer_stock failed"));
}

#[tokio::test]
async fn test_unknown_product_line_rejected() {
    let env = create_test_env("VGA").await.unwrap();

    let ctx = BatchContext::new(env.data_dir.clone());
    let result = execute_batch(&env.database_url, &ctx, "GPU").await;

    assert!(!result.success);
    assert!(result.message.starts_with("Invalid product line: GPU"), "{}", result.message);
    assert!(result.message.contains("VGA"));
    assert!(result.rma_stats.is_none());
    assert!(result.stock_stats.is_none());
}

#[tokio::test]
async fn test_missing_database_is_connection_failure() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("absent.db").display());

    let ctx = BatchContext::new(dir.path().to_path_buf());
    let result = execute_batch(&url, &ctx, "VGA").await;

    assert!(!result.success);
    assert!(result.message.starts_with("Database connection failed"), "{}", result.message);
    assert!(result.rma_stats.is_none());
}

#[tokio::test]
async fn test_field_overrides_rename_columns() {
    let env = create_test_env("VGA").await.unwrap();
    write_rma_workbook(
        &env.data_dir.join("VGA_RMA_record.xlsx"),
        &[rma("R-1", "Acme", "SN-1")],
    )
    .unwrap();
    write_stock_workbook(&env.data_dir.join("VGA_buffer_stock.xlsx"), &[stock("BS-1", 1.0)])
        .unwrap();

    // Route the customer column into the remark field instead
    let mut fields = FieldOverrides::default();
    fields
        .rma
        .insert("Customer Name".to_string(), "Remark".to_string());

    let ctx = BatchContext::new(env.data_dir.clone()).with_fields(fields);
    let result = execute_batch(&env.database_url, &ctx, "VGA").await;
    assert!(result.success, "{:?}", result);

    assert_eq!(
        fetch_record(&env.pool, "VGA_RMA_record", "SN-1", "Remark")
            .await
            .unwrap()
            .as_deref(),
        Some("Acme")
    );
    assert_eq!(
        fetch_record(&env.pool, "VGA_RMA_record", "SN-1", "Customer_Name")
            .await
            .unwrap(),
        None
    );
}
