//! Scripted upstream for integration tests.
//!
//! Responses are queued per `(item_id, scope)`. Each step may carry a delay,
//! which runs on tokio time so paused-clock tests stay deterministic. Once a
//! queue is empty the source answers with an empty successful payload.

use async_trait::async_trait;
use mb_core::{HistoryEntry, Listing, MarketData};
use mb_universalis::{
    SnapshotRequest, SnapshotSource, StatusProbe, UpstreamError, UpstreamResult,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct Step {
    pub delay: Duration,
    pub result: UpstreamResult<MarketData>,
}

impl Step {
    pub fn ok(data: MarketData) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(data),
        }
    }

    pub fn err(error: UpstreamError) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(error),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
pub struct MockSource {
    scripts: Mutex<HashMap<(u32, String), VecDeque<Step>>>,
    calls: Mutex<Vec<SnapshotRequest>>,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, item_id: u32, scope: &str, step: Step) {
        self.scripts
            .lock()
            .entry((item_id, scope.to_string()))
            .or_default()
            .push_back(step);
    }

    pub fn calls(&self) -> Vec<SnapshotRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, item_id: u32, scope: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.item_id == item_id && r.scope.as_str() == scope)
            .count()
    }
}

#[async_trait]
impl SnapshotSource for MockSource {
    async fn fetch_market_data(&self, request: &SnapshotRequest) -> UpstreamResult<MarketData> {
        self.calls.lock().push(request.clone());

        let step = self
            .scripts
            .lock()
            .get_mut(&(request.item_id, request.scope.as_str().to_string()))
            .and_then(VecDeque::pop_front);

        let Some(step) = step else {
            return Ok(market_data(request.item_id, &[]));
        };

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }
        step.result
    }
}

/// Probe with a switchable answer.
pub struct MockProbe {
    up: AtomicBool,
}

impl MockProbe {
    pub fn up() -> Arc<Self> {
        Arc::new(Self {
            up: AtomicBool::new(true),
        })
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatusProbe for MockProbe {
    async fn probe(&self) -> UpstreamResult<()> {
        if self.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(UpstreamError::Transport("connection refused".to_string()))
        }
    }
}

pub fn listing(unit_price: u64, world_name: &str) -> Listing {
    Listing {
        unit_price,
        quantity: 1,
        total: unit_price,
        hq: false,
        retainer_name: "Retainer".to_string(),
        world_name: world_name.to_string(),
        tax: unit_price / 20,
    }
}

pub fn sale(unit_price: u64, timestamp: i64, world_name: &str) -> HistoryEntry {
    HistoryEntry {
        unit_price,
        quantity: 1,
        total: unit_price,
        hq: false,
        timestamp,
        buyer_name: "Buyer".to_string(),
        world_name: world_name.to_string(),
    }
}

/// Payload with one listing per price, all on the same world.
pub fn market_data(item_id: u32, prices: &[u64]) -> MarketData {
    MarketData {
        item_id,
        listings: prices.iter().map(|&p| listing(p, "Tonberry")).collect(),
        history: Vec::new(),
        last_upload_time_ms: 0,
    }
}

pub fn prices(listings: &[Listing]) -> Vec<u64> {
    listings.iter().map(|l| l.unit_price).collect()
}
