//! Test Helper Utilities
//!
//! Shared utilities for rma-batch integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod workbooks;

pub use db_utils::{count_rows, create_test_env, fetch_record, TestEnv};
pub use workbooks::{write_rma_workbook, write_stock_workbook, RmaRow, StockRow};
