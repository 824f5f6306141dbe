//! Market snapshot cache and refresh coordination.
//!
//! Data flows one way:
//! selection change -> `RefreshCoordinator` -> `RetryingFetcher` ->
//! `SnapshotCache` -> published `RefreshView` -> renderer.
//!
//! `StatusMonitor` runs independently and only writes the liveness flag.
//! `MarketBoard` bundles both behind the surface a UI consumes.

pub mod board;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod status;

pub use board::MarketBoard;
pub use cache::SnapshotCache;
pub use config::{RefreshConfig, RefreshOptions};
pub use coordinator::{
    BasisChange, FetchFailure, RefreshCoordinator, RefreshOutcome, RefreshView,
};
pub use error::{RefreshError, RefreshResult};
pub use status::StatusMonitor;
