//! Database connection and product line registry

pub mod init;
pub mod product_lines;

pub use init::*;
pub use product_lines::*;
