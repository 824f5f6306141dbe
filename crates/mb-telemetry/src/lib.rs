//! Prometheus metrics and structured logging for the market board.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for cache, fetch and upstream status activity

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
