//! Prometheus metrics for the market board.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error caught on first use.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_counter, register_int_gauge, CounterVec, Encoder,
    IntCounter, IntGauge, TextEncoder,
};

/// Cache lookups that found a fresh snapshot.
pub static CACHE_HIT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("mb_cache_hit_total", "Refresh requests served from cache").unwrap()
});

/// Cache lookups that required a fetch (absent or stale).
pub static CACHE_MISS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mb_cache_miss_total",
        "Refresh requests that required a fetch"
    )
    .unwrap()
});

/// Entries evicted because the cache was at capacity.
pub static CACHE_EVICTION_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "mb_cache_eviction_total",
        "Snapshots evicted at capacity"
    )
    .unwrap()
});

/// Upstream call attempts, including retries.
/// Labels: result (ok, or the error kind: transport/status/parse/cancelled/invalid_request)
pub static FETCH_ATTEMPT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mb_fetch_attempt_total",
        "Upstream snapshot fetch attempts",
        &["result"]
    )
    .unwrap()
});

/// Terminal refresh outcomes.
/// Labels: outcome (success/failure/cancelled/superseded)
pub static REFRESH_OUTCOME_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mb_refresh_outcome_total",
        "Terminal refresh outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Supplemental scope merges.
/// Labels: result (merged/failed)
pub static SUPPLEMENTAL_MERGE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "mb_supplemental_merge_total",
        "Supplemental scope merge attempts",
        &["result"]
    )
    .unwrap()
});

/// Last upstream probe result (1 = up).
pub static UPSTREAM_UP: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("mb_upstream_up", "Last upstream status probe (1=up)").unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn cache_hit() {
        CACHE_HIT_TOTAL.inc();
    }

    pub fn cache_miss() {
        CACHE_MISS_TOTAL.inc();
    }

    pub fn cache_eviction() {
        CACHE_EVICTION_TOTAL.inc();
    }

    /// Record one upstream attempt.
    pub fn fetch_attempt(result: &str) {
        FETCH_ATTEMPT_TOTAL.with_label_values(&[result]).inc();
    }

    /// Record how a refresh ended.
    pub fn refresh_outcome(outcome: &str) {
        REFRESH_OUTCOME_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn supplemental_merge(result: &str) {
        SUPPLEMENTAL_MERGE_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn upstream_status(up: bool) {
        UPSTREAM_UP.set(i64::from(up));
    }

    /// Render every registered metric in the text exposition format.
    pub fn gather_text() -> TelemetryResult<String> {
        let families = prometheus::gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
