//! Bounded snapshot cache.
//!
//! Holds at most `capacity` snapshots keyed by `(item, scope)`. Inserting
//! past capacity evicts the least recently *inserted* entry; reads do not
//! refresh an entry's position. Staleness is judged against the snapshot's
//! local `fetched_at_ms`.
//!
//! The cache is plain data with `&mut self` mutation. The coordinator owns
//! it behind its state lock; nothing else writes to it.

use mb_core::{Clock, Snapshot, SnapshotKey};
use mb_telemetry::Metrics;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

/// One cached snapshot.
#[derive(Debug, Clone)]
struct CacheEntry {
    snapshot: Arc<Snapshot>,
    /// Monotonic insertion counter; smallest is evicted first.
    insertion_order: u64,
}

/// Insertion-ordered, capacity-bounded map from key to snapshot.
pub struct SnapshotCache {
    entries: HashMap<SnapshotKey, CacheEntry>,
    /// insertion_order -> key, oldest first.
    order: BTreeMap<u64, SnapshotKey>,
    next_order: u64,
    capacity: usize,
    clock: Arc<dyn Clock>,
}

impl SnapshotCache {
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_order: 0,
            capacity: capacity.max(1),
            clock,
        }
    }

    /// Cached snapshot for `key`, fresh or not. Does not touch eviction order.
    pub fn get(&self, key: &SnapshotKey) -> Option<Arc<Snapshot>> {
        self.entries.get(key).map(|e| e.snapshot.clone())
    }

    /// `true` iff present and `now - fetched_at_ms < ttl_ms`.
    pub fn is_fresh(&self, key: &SnapshotKey, ttl_ms: u64) -> bool {
        let Some(entry) = self.entries.get(key) else {
            return false;
        };
        let ttl_ms = i64::try_from(ttl_ms).unwrap_or(i64::MAX);
        entry.snapshot.age_ms(self.clock.now_ms()) < ttl_ms
    }

    /// Insert or replace the entry for `key`.
    ///
    /// Returns the key evicted to stay within capacity, if any.
    pub fn put(&mut self, key: SnapshotKey, snapshot: Arc<Snapshot>) -> Option<SnapshotKey> {
        if let Some(old) = self.entries.remove(&key) {
            self.order.remove(&old.insertion_order);
        }

        let insertion_order = self.next_order;
        self.next_order += 1;

        self.order.insert(insertion_order, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                snapshot,
                insertion_order,
            },
        );

        if self.entries.len() > self.capacity {
            return self.evict_oldest();
        }
        None
    }

    /// Drop the entry for `key`, returning its snapshot.
    pub fn remove(&mut self, key: &SnapshotKey) -> Option<Arc<Snapshot>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.insertion_order);
        Some(entry.snapshot)
    }

    /// Drop every entry. The insertion counter keeps counting.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) -> Option<SnapshotKey> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Metrics::cache_eviction();
        debug!(key = %key, "Evicted oldest snapshot");
        Some(key)
    }

    #[cfg(test)]
    fn contains(&self, key: &SnapshotKey) -> bool {
        self.entries.contains_key(key)
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys from oldest to newest insertion.
    #[cfg(test)]
    fn keys(&self) -> Vec<SnapshotKey> {
        self.order.values().cloned().collect()
    }

    #[cfg(test)]
    fn insertion_order(&self, key: &SnapshotKey) -> Option<u64> {
        self.entries.get(key).map(|e| e.insertion_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_core::{ManualClock, MarketData, MarketScope};

    fn key(item_id: u32) -> SnapshotKey {
        SnapshotKey::new(item_id, MarketScope::new("Chaos"))
    }

    fn snapshot(item_id: u32, fetched_at_ms: i64) -> Arc<Snapshot> {
        Arc::new(Snapshot::stamp(
            MarketData {
                item_id,
                ..Default::default()
            },
            fetched_at_ms,
        ))
    }

    fn cache(capacity: usize) -> (SnapshotCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        (SnapshotCache::new(capacity, clock.clone()), clock)
    }

    #[test]
    fn test_get_absent_and_present() {
        let (mut c, _) = cache(3);
        assert!(c.get(&key(1)).is_none());

        c.put(key(1), snapshot(1, 0));
        assert_eq!(c.get(&key(1)).unwrap().item_id, 1);
        assert!(c.get(&key(2)).is_none());
    }

    #[test]
    fn test_ttl_window_is_half_open() {
        let (mut c, clock) = cache(3);
        let t = 1_000_000;
        let ttl = 30_000;
        clock.set(t);
        c.put(key(1), snapshot(1, t));

        for now in [t, t + 1, t + ttl as i64 - 1] {
            clock.set(now);
            assert!(c.is_fresh(&key(1), ttl), "expected fresh at {now}");
        }
        for now in [t + ttl as i64, t + ttl as i64 + 1, t + 10 * ttl as i64] {
            clock.set(now);
            assert!(!c.is_fresh(&key(1), ttl), "expected stale at {now}");
        }
    }

    #[test]
    fn test_absent_is_never_fresh() {
        let (c, _) = cache(3);
        assert!(!c.is_fresh(&key(9), u64::MAX));
    }

    #[test]
    fn test_capacity_evicts_least_recently_inserted() {
        let n = 4;
        let (mut c, _) = cache(n);
        for id in 0..n as u32 {
            assert!(c.put(key(id), snapshot(id, 0)).is_none());
        }

        // Reads do not change eviction order.
        assert!(c.get(&key(0)).is_some());

        let evicted = c.put(key(100), snapshot(100, 0));
        assert_eq!(evicted, Some(key(0)));
        assert_eq!(c.len(), n);
        assert!(!c.contains(&key(0)));
        assert!(c.contains(&key(100)));
    }

    #[test]
    fn test_replace_moves_key_to_newest() {
        let (mut c, _) = cache(2);
        c.put(key(1), snapshot(1, 0));
        c.put(key(2), snapshot(2, 0));

        // Re-inserting 1 makes 2 the oldest.
        c.put(key(1), snapshot(1, 5));
        assert_eq!(c.len(), 2);
        assert_eq!(c.keys(), vec![key(2), key(1)]);
        assert_eq!(c.get(&key(1)).unwrap().fetched_at_ms, 5);

        let evicted = c.put(key(3), snapshot(3, 0));
        assert_eq!(evicted, Some(key(2)));
    }

    #[test]
    fn test_insertion_order_is_monotonic() {
        let (mut c, _) = cache(5);
        c.put(key(1), snapshot(1, 0));
        c.put(key(2), snapshot(2, 0));
        c.put(key(1), snapshot(1, 0));

        let a = c.insertion_order(&key(2)).unwrap();
        let b = c.insertion_order(&key(1)).unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_remove_and_clear() {
        let (mut c, _) = cache(3);
        c.put(key(1), snapshot(1, 0));
        c.put(key(2), snapshot(2, 0));

        assert!(c.remove(&key(1)).is_some());
        assert!(c.remove(&key(1)).is_none());
        assert_eq!(c.keys(), vec![key(2)]);

        c.clear();
        assert!(c.is_empty());
        assert!(c.keys().is_empty());

        // Still usable after clear.
        c.put(key(3), snapshot(3, 0));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (mut c, _) = cache(0);
        assert_eq!(c.capacity(), 1);
        c.put(key(1), snapshot(1, 0));
        assert_eq!(c.put(key(2), snapshot(2, 0)), Some(key(1)));
    }
}
