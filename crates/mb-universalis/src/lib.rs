//! Upstream market data access.
//!
//! - `SnapshotSource` / `StatusProbe`: the capabilities the core consumes
//! - `UniversalisClient`: reqwest implementation of both
//! - `RetryingFetcher`: bounded exponential backoff with jitter, cancellable

pub mod client;
pub mod error;
pub mod models;
pub mod retry;
pub mod source;

pub use client::{UniversalisClient, UpstreamConfig};
pub use error::{UpstreamError, UpstreamResult};
pub use models::DataCenter;
pub use retry::{RetryPolicy, RetryingFetcher};
pub use source::{SnapshotRequest, SnapshotSource, StatusProbe};
