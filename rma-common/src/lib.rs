//! # RMA Common Library
//!
//! Shared code for the RMA batch ingest tools:
//! - Error type used by configuration and registry code
//! - Configuration loading (CLI overrides, TOML file, compiled defaults)
//! - Database connection setup and the product line registry

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
