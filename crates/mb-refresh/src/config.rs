//! Refresh configuration.

use crate::error::{RefreshError, RefreshResult};
use mb_core::{MarketScope, Region};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Cache, refresh and status-probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Snapshot time-to-live (ms). Default: 30,000.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
    /// Maximum cached snapshots. Default: 10.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Listings requested and kept after a merge. Default: 50.
    #[serde(default = "default_listing_limit")]
    pub listing_limit: usize,
    /// Sales requested and kept after a merge. Default: 50.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Request tax-free prices. Default: false.
    #[serde(default)]
    pub no_tax: bool,
    /// Scope -> supplemental scope merged into its results.
    /// Default: North-America -> Oceania.
    #[serde(default = "default_supplemental_scopes")]
    pub supplemental_scopes: HashMap<String, String>,
    /// Upstream status probe interval (seconds). Default: 600.
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

fn default_ttl_ms() -> u64 {
    30_000
}

fn default_cache_capacity() -> usize {
    10
}

fn default_listing_limit() -> usize {
    50
}

fn default_history_limit() -> usize {
    50
}

fn default_supplemental_scopes() -> HashMap<String, String> {
    HashMap::from([(
        Region::NorthAmerica.name().to_string(),
        Region::Oceania.name().to_string(),
    )])
}

fn default_status_interval_secs() -> u64 {
    600
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            cache_capacity: default_cache_capacity(),
            listing_limit: default_listing_limit(),
            history_limit: default_history_limit(),
            no_tax: false,
            supplemental_scopes: default_supplemental_scopes(),
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

impl RefreshConfig {
    pub fn validate(&self) -> RefreshResult<()> {
        if self.ttl_ms == 0 {
            return Err(RefreshError::InvalidConfig("ttl_ms must be > 0".to_string()));
        }
        if self.cache_capacity == 0 {
            return Err(RefreshError::InvalidConfig(
                "cache_capacity must be > 0".to_string(),
            ));
        }
        if self.status_interval_secs == 0 {
            return Err(RefreshError::InvalidConfig(
                "status_interval_secs must be > 0".to_string(),
            ));
        }
        for (scope, supplemental) in &self.supplemental_scopes {
            let scope = MarketScope::parse(scope)?;
            let supplemental = MarketScope::parse(supplemental)?;
            if scope == supplemental {
                return Err(RefreshError::InvalidConfig(format!(
                    "scope {scope} cannot supplement itself"
                )));
            }
        }
        Ok(())
    }

    /// Per-request options derived from this config.
    pub fn options(&self) -> RefreshOptions {
        RefreshOptions {
            ttl_ms: self.ttl_ms,
            listing_limit: self.listing_limit,
            history_limit: self.history_limit,
        }
    }

    pub fn supplemental_map(&self) -> HashMap<MarketScope, MarketScope> {
        self.supplemental_scopes
            .iter()
            .map(|(k, v)| (MarketScope::new(k.trim()), MarketScope::new(v.trim())))
            .collect()
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }
}

/// Options carried by one refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
    pub ttl_ms: u64,
    pub listing_limit: usize,
    pub history_limit: usize,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        RefreshConfig::default().options()
    }
}
