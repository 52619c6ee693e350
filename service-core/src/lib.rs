//! service-core: Shared HTTP service infrastructure (config, errors, logging, middleware).
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use axum;
pub use serde;
pub use tracing;
