//! Upstream capabilities consumed by the refresh core.

use crate::error::UpstreamResult;
use async_trait::async_trait;
use mb_core::{MarketData, MarketScope};

/// Parameters for one snapshot fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRequest {
    pub item_id: u32,
    pub scope: MarketScope,
    pub listing_limit: usize,
    pub history_limit: usize,
    /// Ask the upstream for tax-free prices.
    pub no_tax: bool,
}

/// Fetches raw market data for `(item, scope)`.
///
/// Implementations perform exactly one remote call per invocation; retry
/// and cancellation are layered on top by [`crate::RetryingFetcher`].
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_market_data(&self, request: &SnapshotRequest) -> UpstreamResult<MarketData>;
}

/// Lightweight reachability check.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Succeeds only if the upstream answered.
    async fn probe(&self) -> UpstreamResult<()>;
}
