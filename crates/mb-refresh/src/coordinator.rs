//! Refresh coordination.
//!
//! Turns "show me item X in scope S" into at most one outstanding fetch.
//!
//! State machine (per coordinator, since only one selection is current):
//! - Idle: no fetch outstanding
//! - Fetching: one `RetryingFetcher` call outstanding, owning the single
//!   current `CancellationToken` and a generation number
//!
//! Every fetch-starting request cancels the previous token and bumps the
//! generation under the state lock. A completing fetch writes to the cache
//! and publishes only if its generation is still current, so a slow,
//! superseded response can never overwrite newer data.

use crate::cache::SnapshotCache;
use crate::config::{RefreshConfig, RefreshOptions};
use mb_core::{Clock, MarketScope, Snapshot, SnapshotKey};
use mb_telemetry::Metrics;
use mb_universalis::{RetryingFetcher, SnapshotRequest, UpstreamError, UpstreamResult};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// User-visible failure of the last refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub key: SnapshotKey,
    pub message: String,
    /// Whether the terminal error was of a transient class.
    pub retryable: bool,
}

impl FetchFailure {
    fn new(key: SnapshotKey, error: &UpstreamError) -> Self {
        Self {
            key,
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Published state read by the renderer.
#[derive(Debug, Clone, Default)]
pub struct RefreshView {
    /// Key of the current selection.
    pub key: Option<SnapshotKey>,
    /// Data to display. While loading this is the stale cached snapshot for
    /// `key`, if one exists.
    pub snapshot: Option<Arc<Snapshot>>,
    /// A fetch for `key` is outstanding.
    pub loading: bool,
    /// Failure of the last completed refresh. Cleared when a new one starts.
    pub last_error: Option<FetchFailure>,
}

/// Result of [`RefreshCoordinator::request_refresh`].
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Served from cache; no network call.
    Cached(Arc<Snapshot>),
    /// A fetch was started.
    Fetching(JoinHandle<()>),
}

impl RefreshOutcome {
    /// Whether the request was answered without a network call.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    /// Wait for the started fetch (if any) to finish.
    pub async fn wait(self) {
        if let Self::Fetching(handle) = self {
            if let Err(e) = handle.await {
                warn!(error = %e, "Refresh task failed to complete");
            }
        }
    }
}

/// Result of [`RefreshCoordinator::set_no_tax`].
#[derive(Debug)]
pub enum BasisChange {
    /// The requested basis was already active.
    Unchanged,
    /// Basis switched and the cache was cleared. Carries the refetch of the
    /// current selection, or `None` if nothing was selected yet.
    Changed(Option<RefreshOutcome>),
}

impl BasisChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }

    /// Wait for the triggered refetch (if any) to finish.
    pub async fn wait(self) {
        if let Self::Changed(Some(outcome)) = self {
            outcome.wait().await;
        }
    }
}

struct InFlight {
    key: SnapshotKey,
    generation: u64,
    cancel: CancellationToken,
}

struct CoordinatorState {
    cache: SnapshotCache,
    /// `Some` while Fetching.
    in_flight: Option<InFlight>,
    next_generation: u64,
    /// Last requested key and options, replayed by `reset_all`.
    selection: Option<(SnapshotKey, RefreshOptions)>,
    no_tax: bool,
}

struct Shared {
    fetcher: RetryingFetcher,
    supplemental: HashMap<MarketScope, MarketScope>,
    state: Mutex<CoordinatorState>,
    view_tx: watch::Sender<RefreshView>,
}

/// Cache-first refresh coordinator. Cheap to clone.
#[derive(Clone)]
pub struct RefreshCoordinator {
    shared: Arc<Shared>,
}

impl RefreshCoordinator {
    /// Build an idle coordinator with an empty cache. `clock` judges
    /// staleness; `fetcher` stamps with its own clock.
    pub fn new(fetcher: RetryingFetcher, config: &RefreshConfig, clock: Arc<dyn Clock>) -> Self {
        let (view_tx, _) = watch::channel(RefreshView::default());

        Self {
            shared: Arc::new(Shared {
                fetcher,
                supplemental: config.supplemental_map(),
                state: Mutex::new(CoordinatorState {
                    cache: SnapshotCache::new(config.cache_capacity, clock),
                    in_flight: None,
                    next_generation: 0,
                    selection: None,
                    no_tax: config.no_tax,
                }),
                view_tx,
            }),
        }
    }

    /// Show `(item_id, scope)`, fetching only if the cached copy is absent
    /// or older than `options.ttl_ms`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn request_refresh(
        &self,
        item_id: u32,
        scope: MarketScope,
        options: RefreshOptions,
    ) -> RefreshOutcome {
        let key = SnapshotKey::new(item_id, scope);
        let mut state = self.shared.state.lock();
        state.selection = Some((key.clone(), options));

        if state.cache.is_fresh(&key, options.ttl_ms) {
            if let Some(snapshot) = state.cache.get(&key) {
                // Selection moved away from whatever is still in flight.
                if state.in_flight.as_ref().is_some_and(|f| f.key != key) {
                    if let Some(prev) = state.in_flight.take() {
                        prev.cancel.cancel();
                        debug!(superseded = %prev.key, generation = prev.generation, "Cancelled refresh for previous selection");
                    }
                }

                Metrics::cache_hit();
                debug!(key = %key, fetched_at_ms = snapshot.fetched_at_ms, "Serving fresh snapshot from cache");
                self.shared.publish(RefreshView {
                    key: Some(key),
                    snapshot: Some(snapshot.clone()),
                    loading: false,
                    last_error: None,
                });
                return RefreshOutcome::Cached(snapshot);
            }
        }

        Metrics::cache_miss();
        self.begin_fetch(&mut state, key, options)
    }

    /// Clear the cache and re-request the current selection.
    ///
    /// Returns `None` if nothing was ever selected.
    pub fn reset_all(&self) -> Option<RefreshOutcome> {
        let mut state = self.shared.state.lock();
        state.cache.clear();
        if let Some(prev) = state.in_flight.take() {
            prev.cancel.cancel();
        }
        info!("Snapshot cache cleared");

        let (key, options) = state.selection.clone()?;
        Some(self.begin_fetch(&mut state, key, options))
    }

    /// Drop the cached snapshot for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &SnapshotKey) -> bool {
        let removed = self.shared.state.lock().cache.remove(key).is_some();
        debug!(key = %key, removed, "Invalidated snapshot");
        removed
    }

    /// Switch the price basis. Cached prices are invalid under the other
    /// basis, so a change triggers [`Self::reset_all`].
    pub fn set_no_tax(&self, no_tax: bool) -> BasisChange {
        {
            let mut state = self.shared.state.lock();
            if state.no_tax == no_tax {
                return BasisChange::Unchanged;
            }
            state.no_tax = no_tax;
        }
        info!(no_tax, "Price basis changed");
        BasisChange::Changed(self.reset_all())
    }

    /// Cancel any outstanding fetch without starting another.
    pub fn cancel(&self) {
        if let Some(prev) = self.shared.state.lock().in_flight.take() {
            prev.cancel.cancel();
            debug!(key = %prev.key, generation = prev.generation, "Refresh cancelled");
        }
    }

    // -- Published outputs --------------------------------------------------

    /// Copy of the latest published view.
    pub fn view(&self) -> RefreshView {
        self.shared.view_tx.borrow().clone()
    }

    /// Receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<RefreshView> {
        self.shared.view_tx.subscribe()
    }

    /// Snapshot currently on display, possibly stale while loading.
    pub fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.shared.view_tx.borrow().snapshot.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.view_tx.borrow().loading
    }

    /// Failure of the last completed refresh, if it failed.
    pub fn last_error(&self) -> Option<FetchFailure> {
        self.shared.view_tx.borrow().last_error.clone()
    }

    // -- Inspection ---------------------------------------------------------

    /// Cached snapshot for `key`, ignoring freshness.
    pub fn cached(&self, key: &SnapshotKey) -> Option<Arc<Snapshot>> {
        self.shared.state.lock().cache.get(key)
    }

    /// Number of cached snapshots.
    pub fn cache_len(&self) -> usize {
        self.shared.state.lock().cache.len()
    }

    /// Whether a fetch is outstanding (Fetching state).
    pub fn is_fetching(&self) -> bool {
        self.shared.state.lock().in_flight.is_some()
    }

    /// Current price basis sent with requests.
    pub fn no_tax(&self) -> bool {
        self.shared.state.lock().no_tax
    }

    /// Transition to Fetching for `key`. Caller holds the state lock, so
    /// the token swap and the transition are one atomic step.
    fn begin_fetch(
        &self,
        state: &mut MutexGuard<'_, CoordinatorState>,
        key: SnapshotKey,
        options: RefreshOptions,
    ) -> RefreshOutcome {
        if let Some(prev) = state.in_flight.take() {
            prev.cancel.cancel();
            debug!(superseded = %prev.key, generation = prev.generation, "Superseded in-flight refresh");
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let cancel = CancellationToken::new();
        state.in_flight = Some(InFlight {
            key: key.clone(),
            generation,
            cancel: cancel.clone(),
        });

        debug!(key = %key, generation, "Refresh started");
        self.shared.publish(RefreshView {
            key: Some(key.clone()),
            snapshot: state.cache.get(&key),
            loading: true,
            last_error: None,
        });

        let request = SnapshotRequest {
            item_id: key.item_id,
            scope: key.scope.clone(),
            listing_limit: options.listing_limit,
            history_limit: options.history_limit,
            no_tax: state.no_tax,
        };

        let shared = self.shared.clone();
        RefreshOutcome::Fetching(tokio::spawn(async move {
            shared.run_fetch(key, request, generation, cancel).await;
        }))
    }
}

impl Shared {
    fn publish(&self, view: RefreshView) {
        self.view_tx.send_replace(view);
    }

    async fn run_fetch(
        &self,
        key: SnapshotKey,
        request: SnapshotRequest,
        generation: u64,
        cancel: CancellationToken,
    ) {
        let result = match self.fetcher.fetch(&request, &cancel).await {
            Ok(primary) => Ok(self.merge_supplemental(primary, &request, &cancel).await),
            Err(e) => Err(e),
        };
        self.complete(key, generation, &cancel, result);
    }

    /// Fold a configured supplemental scope into `primary`.
    ///
    /// Failure here is never fatal: the primary snapshot is returned as is.
    async fn merge_supplemental(
        &self,
        primary: Snapshot,
        request: &SnapshotRequest,
        cancel: &CancellationToken,
    ) -> Snapshot {
        let Some(supplemental_scope) = self.supplemental.get(&request.scope) else {
            return primary;
        };

        let supplemental_request = SnapshotRequest {
            scope: supplemental_scope.clone(),
            ..request.clone()
        };

        match self.fetcher.fetch(&supplemental_request, cancel).await {
            Ok(supplemental) => {
                Metrics::supplemental_merge("merged");
                debug!(
                    item_id = request.item_id,
                    scope = %request.scope,
                    supplemental = %supplemental_scope,
                    extra_listings = supplemental.listings.len(),
                    "Merging supplemental scope"
                );
                primary.merge(supplemental, request.listing_limit, request.history_limit)
            }
            // Completion discards the whole result.
            Err(UpstreamError::Cancelled) => primary,
            Err(e) => {
                Metrics::supplemental_merge("failed");
                warn!(
                    item_id = request.item_id,
                    scope = %request.scope,
                    supplemental = %supplemental_scope,
                    error = %e,
                    "Supplemental fetch failed, publishing primary only"
                );
                primary
            }
        }
    }

    /// Apply a finished fetch if it is still the current one.
    fn complete(
        &self,
        key: SnapshotKey,
        generation: u64,
        cancel: &CancellationToken,
        result: UpstreamResult<Snapshot>,
    ) {
        let mut state = self.state.lock();

        let is_current = state
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation);
        if !is_current {
            Metrics::refresh_outcome("superseded");
            debug!(key = %key, generation, "Discarding superseded refresh result");
            return;
        }

        state.in_flight = None;

        if cancel.is_cancelled() || matches!(result, Err(UpstreamError::Cancelled)) {
            Metrics::refresh_outcome("cancelled");
            debug!(key = %key, generation, "Refresh cancelled");
            let prior = state.cache.get(&key);
            self.publish(RefreshView {
                key: Some(key),
                snapshot: prior,
                loading: false,
                last_error: None,
            });
            return;
        }

        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                state.cache.put(key.clone(), snapshot.clone());
                Metrics::refresh_outcome("success");
                debug!(
                    key = %key,
                    generation,
                    listings = snapshot.listings.len(),
                    history = snapshot.history.len(),
                    "Refresh completed"
                );
                self.publish(RefreshView {
                    key: Some(key),
                    snapshot: Some(snapshot),
                    loading: false,
                    last_error: None,
                });
            }
            Err(e) => {
                Metrics::refresh_outcome("failure");
                warn!(key = %key, generation, error = %e, "Refresh failed");
                let prior = state.cache.get(&key);
                let failure = FetchFailure::new(key.clone(), &e);
                self.publish(RefreshView {
                    key: Some(key),
                    snapshot: prior,
                    loading: false,
                    last_error: Some(failure),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_core::{ManualClock, MarketData};
    use mb_universalis::{RetryPolicy, SnapshotSource};

    /// Source that never gets called; these tests drive `complete` directly.
    struct NoSource;

    #[async_trait::async_trait]
    impl SnapshotSource for NoSource {
        async fn fetch_market_data(&self, _request: &SnapshotRequest) -> UpstreamResult<MarketData> {
            Err(UpstreamError::Cancelled)
        }
    }

    fn coordinator() -> RefreshCoordinator {
        let clock = Arc::new(ManualClock::new(0));
        let fetcher = RetryingFetcher::new(Arc::new(NoSource), RetryPolicy::default(), clock.clone());
        RefreshCoordinator::new(fetcher, &RefreshConfig::default(), clock)
    }

    fn key() -> SnapshotKey {
        SnapshotKey::new(5057, MarketScope::new("Chaos"))
    }

    fn snapshot(fetched_at_ms: i64) -> Snapshot {
        Snapshot::stamp(
            MarketData {
                item_id: 5057,
                ..Default::default()
            },
            fetched_at_ms,
        )
    }

    /// Put the coordinator in Fetching without spawning anything.
    fn enter_fetching(c: &RefreshCoordinator) -> (u64, CancellationToken) {
        let mut state = c.shared.state.lock();
        if let Some(prev) = state.in_flight.take() {
            prev.cancel.cancel();
        }
        state.next_generation += 1;
        let generation = state.next_generation;
        let cancel = CancellationToken::new();
        state.in_flight = Some(InFlight {
            key: key(),
            generation,
            cancel: cancel.clone(),
        });
        (generation, cancel)
    }

    #[test]
    fn test_late_result_with_stale_generation_is_dropped() {
        let c = coordinator();
        let (old_gen, old_cancel) = enter_fetching(&c);
        let (new_gen, new_cancel) = enter_fetching(&c);

        // Newer fetch lands first.
        c.shared.complete(key(), new_gen, &new_cancel, Ok(snapshot(2_000)));
        // Older fetch returns data anyway (network raced the cancel).
        c.shared.complete(key(), old_gen, &old_cancel, Ok(snapshot(1_000)));

        assert_eq!(c.cached(&key()).unwrap().fetched_at_ms, 2_000);
        assert_eq!(c.current_snapshot().unwrap().fetched_at_ms, 2_000);
        assert!(!c.is_fetching());
    }

    #[test]
    fn test_failure_keeps_prior_snapshot_and_sets_error() {
        let c = coordinator();
        let (g1, t1) = enter_fetching(&c);
        c.shared.complete(key(), g1, &t1, Ok(snapshot(1_000)));

        let (g2, t2) = enter_fetching(&c);
        c.shared.complete(
            key(),
            g2,
            &t2,
            Err(UpstreamError::Status {
                status: 502,
                body: "Bad Gateway".to_string(),
            }),
        );

        let view = c.view();
        assert!(!view.loading);
        assert_eq!(view.snapshot.unwrap().fetched_at_ms, 1_000);
        let failure = view.last_error.unwrap();
        assert_eq!(failure.key, key());
        assert!(failure.retryable);
        assert!(failure.message.contains("502"));
    }

    #[test]
    fn test_cancelled_current_fetch_returns_to_idle_without_error() {
        let c = coordinator();
        let (g, t) = enter_fetching(&c);
        t.cancel();
        c.shared.complete(key(), g, &t, Ok(snapshot(1_000)));

        assert!(!c.is_fetching());
        assert!(c.cached(&key()).is_none());
        assert!(c.last_error().is_none());
        assert!(!c.is_loading());
    }

    #[test]
    fn test_invalidate_and_reset_without_selection() {
        let c = coordinator();
        let (g, t) = enter_fetching(&c);
        c.shared.complete(key(), g, &t, Ok(snapshot(1_000)));

        assert!(c.invalidate(&key()));
        assert!(!c.invalidate(&key()));
        assert!(c.reset_all().is_none());
        assert_eq!(c.cache_len(), 0);
    }

    #[test]
    fn test_no_tax_toggle_without_selection_reports_change() {
        let c = coordinator();
        let (g, t) = enter_fetching(&c);
        c.shared.complete(key(), g, &t, Ok(snapshot(1_000)));
        assert!(!c.no_tax());

        // Nothing was ever requested, so there is no refetch to start.
        match c.set_no_tax(true) {
            BasisChange::Changed(outcome) => assert!(outcome.is_none()),
            BasisChange::Unchanged => panic!("basis should have changed"),
        }
        assert!(c.no_tax());
        assert_eq!(c.cache_len(), 0);

        assert!(!c.set_no_tax(true).is_changed());
        assert!(c.set_no_tax(false).is_changed());
        assert!(!c.no_tax());
    }
}
