//! Universalis wire models.
//!
//! Only the fields the cache needs are decoded; everything else in the
//! payload is ignored.

use mb_core::{HistoryEntry, Listing, MarketData, Region};
use serde::{Deserialize, Serialize};

/// `GET /{scope}/{itemId}` response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MarketDataResponse {
    #[serde(rename = "itemID")]
    pub item_id: u32,
    /// Present when the scope is a single world; rows then omit their world.
    #[serde(default)]
    pub world_name: Option<String>,
    #[serde(default)]
    pub last_upload_time: i64,
    #[serde(default)]
    pub listings: Vec<RawListing>,
    #[serde(default)]
    pub recent_history: Vec<RawSale>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawListing {
    pub price_per_unit: u64,
    pub quantity: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub hq: bool,
    #[serde(default)]
    pub retainer_name: Option<String>,
    #[serde(default)]
    pub world_name: Option<String>,
    #[serde(default)]
    pub tax: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSale {
    pub price_per_unit: u64,
    pub quantity: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub hq: bool,
    pub timestamp: i64,
    /// Null for anonymised sales.
    #[serde(default)]
    pub buyer_name: Option<String>,
    #[serde(default)]
    pub world_name: Option<String>,
}

impl MarketDataResponse {
    pub(crate) fn into_market_data(self) -> MarketData {
        let fallback_world = self.world_name.unwrap_or_default();

        let listings = self
            .listings
            .into_iter()
            .map(|l| Listing {
                unit_price: l.price_per_unit,
                quantity: l.quantity,
                total: l.total,
                hq: l.hq,
                retainer_name: l.retainer_name.unwrap_or_default(),
                world_name: l.world_name.unwrap_or_else(|| fallback_world.clone()),
                tax: l.tax,
            })
            .collect();

        let history = self
            .recent_history
            .into_iter()
            .map(|s| HistoryEntry {
                unit_price: s.price_per_unit,
                quantity: s.quantity,
                total: s.total,
                hq: s.hq,
                timestamp: s.timestamp,
                buyer_name: s.buyer_name.unwrap_or_default(),
                world_name: s.world_name.unwrap_or_else(|| fallback_world.clone()),
            })
            .collect();

        MarketData {
            item_id: self.item_id,
            listings,
            history,
            last_upload_time_ms: self.last_upload_time,
        }
    }
}

/// One entry of `GET /data-centers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataCenter {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub worlds: Vec<u32>,
}

impl DataCenter {
    pub fn region(&self) -> Option<Region> {
        Region::from_name(&self.region)
    }
}
