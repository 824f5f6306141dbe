//! Market snapshot types.
//!
//! A `Snapshot` is immutable once built. Refreshing a key replaces the
//! stored snapshot as a whole; nothing mutates listings or history in place.
//!
//! Ordering rules (stable, ties keep source order):
//! - listings ascending by unit price
//! - history descending by sale timestamp

use serde::{Deserialize, Serialize};

/// One active sale offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Price per unit, excluding tax.
    pub unit_price: u64,
    pub quantity: u32,
    /// `unit_price * quantity` as reported by the source.
    pub total: u64,
    pub hq: bool,
    /// Seller (retainer) display name.
    pub retainer_name: String,
    /// World the listing is posted on.
    pub world_name: String,
    /// Sales tax on `total`. Zero when the snapshot was fetched tax-free.
    pub tax: u64,
}

impl Listing {
    /// What a buyer actually pays for the whole stack.
    pub fn total_with_tax(&self) -> u64 {
        self.total.saturating_add(self.tax)
    }
}

/// One completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub unit_price: u64,
    pub quantity: u32,
    pub total: u64,
    pub hq: bool,
    /// Unix seconds.
    pub timestamp: i64,
    pub buyer_name: String,
    pub world_name: String,
}

/// Unstamped payload returned by an upstream source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    pub item_id: u32,
    pub listings: Vec<Listing>,
    pub history: Vec<HistoryEntry>,
    /// Last time anyone uploaded data for this item, per the source.
    pub last_upload_time_ms: i64,
}

/// Fetched, immutable bundle of listings and history for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub item_id: u32,
    pub listings: Vec<Listing>,
    pub history: Vec<HistoryEntry>,
    pub last_upload_time_ms: i64,
    /// Local time of the successful fetch. Sole basis for staleness.
    pub fetched_at_ms: i64,
}

impl Snapshot {
    /// Stamp source data with the local fetch time and apply ordering.
    pub fn stamp(data: MarketData, fetched_at_ms: i64) -> Self {
        let mut snapshot = Self {
            item_id: data.item_id,
            listings: data.listings,
            history: data.history,
            last_upload_time_ms: data.last_upload_time_ms,
            fetched_at_ms,
        };
        snapshot.sort();
        snapshot
    }

    /// Merge a supplemental scope's snapshot into this one.
    ///
    /// Rows are concatenated primary-first, re-sorted and truncated. The
    /// sorts are stable, so at a tie on the cutoff boundary primary rows
    /// win. `fetched_at_ms` stays the primary's.
    pub fn merge(self, supplemental: Snapshot, listing_limit: usize, history_limit: usize) -> Self {
        let mut listings = self.listings;
        listings.extend(supplemental.listings);

        let mut history = self.history;
        history.extend(supplemental.history);

        let mut merged = Self {
            item_id: self.item_id,
            listings,
            history,
            last_upload_time_ms: self.last_upload_time_ms.max(supplemental.last_upload_time_ms),
            fetched_at_ms: self.fetched_at_ms,
        };
        merged.sort();
        merged.listings.truncate(listing_limit);
        merged.history.truncate(history_limit);
        merged
    }

    /// Cheapest listing, if any.
    pub fn cheapest_listing(&self) -> Option<&Listing> {
        self.listings.first()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty() && self.history.is_empty()
    }

    /// Milliseconds since the fetch, as seen at `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.fetched_at_ms
    }

    fn sort(&mut self) {
        // sort_by_key is stable
        self.listings.sort_by_key(|l| l.unit_price);
        self.history.sort_by_key(|h| std::cmp::Reverse(h.timestamp));
    }
}
