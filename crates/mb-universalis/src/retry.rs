//! Bounded retry around a single snapshot fetch.
//!
//! Attempts are capped by [`RetryPolicy::max_attempts`] (total calls, not
//! retries). Between attempts the fetcher sleeps `base * 2^(n-1)` capped at
//! `max_delay_ms`, plus uniform jitter. Cancellation is observed before each
//! attempt, while an attempt is in flight, and during the backoff sleep.

use crate::error::{UpstreamError, UpstreamResult};
use crate::source::{SnapshotRequest, SnapshotSource};
use mb_core::{Clock, Snapshot};
use mb_telemetry::Metrics;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first. Default: 3.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt (ms). Default: 200.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on the exponential part (ms). Default: 2000.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Upper bound on added jitter (ms). Default: 100.
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_max_delay_ms() -> u64 {
    2_000
}

fn default_max_jitter_ms() -> u64 {
    100
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        // attempt=1 -> base, attempt=2 -> 2*base, attempt=3 -> 4*base
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << exponent)
            .min(self.max_delay_ms);

        let jitter = if self.max_jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.max_jitter_ms)
        };

        Duration::from_millis(delay + jitter)
    }
}

/// Wraps a [`SnapshotSource`] with retry, cancellation and fetch stamping.
#[derive(Clone)]
pub struct RetryingFetcher {
    source: Arc<dyn SnapshotSource>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl RetryingFetcher {
    pub fn new(source: Arc<dyn SnapshotSource>, policy: RetryPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            source,
            policy,
            clock,
        }
    }

    /// Fetch a snapshot, retrying transient failures.
    ///
    /// On success the snapshot is stamped with `fetched_at_ms = now`.
    /// Returns `UpstreamError::Cancelled` as soon as `cancel` fires.
    pub async fn fetch(
        &self,
        request: &SnapshotRequest,
        cancel: &CancellationToken,
    ) -> UpstreamResult<Snapshot> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                debug!(item_id = request.item_id, scope = %request.scope, attempt, "Fetch cancelled before attempt");
                return Err(UpstreamError::Cancelled);
            }

            attempt += 1;

            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(UpstreamError::Cancelled),
                r = self.source.fetch_market_data(request) => r,
            };

            match result {
                Ok(data) => {
                    Metrics::fetch_attempt("ok");
                    let fetched_at_ms = self.clock.now_ms();
                    debug!(
                        item_id = request.item_id,
                        scope = %request.scope,
                        attempt,
                        fetched_at_ms,
                        "Fetch succeeded"
                    );
                    return Ok(Snapshot::stamp(data, fetched_at_ms));
                }
                Err(e) if e.is_cancelled() => {
                    Metrics::fetch_attempt(e.kind());
                    debug!(item_id = request.item_id, scope = %request.scope, attempt, "Fetch cancelled in flight");
                    return Err(e);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    Metrics::fetch_attempt(e.kind());
                    let delay = self.policy.backoff_delay(attempt);
                    warn!(
                        item_id = request.item_id,
                        scope = %request.scope,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Fetch failed, retrying"
                    );

                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            debug!(item_id = request.item_id, attempt, "Fetch cancelled during backoff");
                            return Err(UpstreamError::Cancelled);
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    Metrics::fetch_attempt(e.kind());
                    warn!(
                        item_id = request.item_id,
                        scope = %request.scope,
                        attempts = attempt,
                        error = %e,
                        "Fetch failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}
