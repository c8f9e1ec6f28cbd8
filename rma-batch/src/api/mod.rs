//! HTTP API handlers for rma-batch

pub mod batch;
pub mod health;
pub mod upload;

pub use batch::batch_routes;
pub use health::health_routes;
pub use upload::upload_routes;
