//! Market board facade.
//!
//! Bundles the refresh coordinator and the status monitor behind the
//! surface a UI consumes: commands in, published outputs out. The
//! renderer only ever reads; it never blocks on a fetch.

use crate::config::{RefreshConfig, RefreshOptions};
use crate::coordinator::{
    BasisChange, FetchFailure, RefreshCoordinator, RefreshOutcome, RefreshView,
};
use crate::error::RefreshResult;
use crate::status::StatusMonitor;
use mb_core::{Clock, MarketScope, Snapshot, SnapshotKey};
use mb_universalis::{RetryPolicy, RetryingFetcher, SnapshotSource, StatusProbe};
use std::sync::Arc;
use tokio::sync::watch;

pub struct MarketBoard {
    coordinator: RefreshCoordinator,
    status: StatusMonitor,
    options: RefreshOptions,
}

impl MarketBoard {
    /// Wire up the coordinator and start the status monitor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: &RefreshConfig,
        retry: RetryPolicy,
        source: Arc<dyn SnapshotSource>,
        probe: Arc<dyn StatusProbe>,
        clock: Arc<dyn Clock>,
    ) -> RefreshResult<Self> {
        config.validate()?;

        let fetcher = RetryingFetcher::new(source, retry, clock.clone());
        let coordinator = RefreshCoordinator::new(fetcher, config, clock);
        let status = StatusMonitor::spawn(probe, config.status_interval());

        Ok(Self {
            coordinator,
            status,
            options: config.options(),
        })
    }

    // -- Commands -------------------------------------------------------------

    /// Select `(item_id, scope)` with the configured options.
    pub fn select(&self, item_id: u32, scope: MarketScope) -> RefreshOutcome {
        self.coordinator.request_refresh(item_id, scope, self.options)
    }

    /// Show `(item_id, scope)`, serving a fresh cached snapshot or starting
    /// a fetch that supersedes any outstanding one.
    pub fn request_refresh(
        &self,
        item_id: u32,
        scope: MarketScope,
        options: RefreshOptions,
    ) -> RefreshOutcome {
        self.coordinator.request_refresh(item_id, scope, options)
    }

    /// Clear the cache and refetch the current selection, if any.
    pub fn reset_all(&self) -> Option<RefreshOutcome> {
        self.coordinator.reset_all()
    }

    /// Drop one cached entry. Returns whether it was present.
    pub fn invalidate(&self, key: &SnapshotKey) -> bool {
        self.coordinator.invalidate(key)
    }

    /// Switch the price basis; see [`RefreshCoordinator::set_no_tax`].
    pub fn set_no_tax(&self, no_tax: bool) -> BasisChange {
        self.coordinator.set_no_tax(no_tax)
    }

    // -- Published outputs ----------------------------------------------------

    /// Snapshot on display. Kept while a newer one loads.
    pub fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.coordinator.current_snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.coordinator.is_loading()
    }

    /// Failure of the last completed refresh.
    pub fn last_error(&self) -> Option<FetchFailure> {
        self.coordinator.last_error()
    }

    /// Result of the most recent status check. `false` until the first
    /// check succeeds.
    pub fn is_upstream_up(&self) -> bool {
        self.status.is_up()
    }

    pub fn view(&self) -> RefreshView {
        self.coordinator.view()
    }

    /// Receiver for every published view.
    pub fn subscribe(&self) -> watch::Receiver<RefreshView> {
        self.coordinator.subscribe()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Options [`Self::select`] uses.
    pub fn options(&self) -> RefreshOptions {
        self.options
    }

    /// Cancel outstanding work and stop the status monitor.
    pub async fn shutdown(&self) {
        self.coordinator.cancel();
        self.status.shutdown().await;
    }
}
