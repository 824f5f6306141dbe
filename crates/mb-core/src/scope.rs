//! Market scope and snapshot key types.
//!
//! A scope names the breadth of a market query: a single world, a data
//! center (cross-world), or a region (cross-data-center). The upstream
//! resolves the name; this crate treats it as an opaque string compared
//! by value.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque market query target (e.g. "Chaos", "Light", "Europe").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketScope(String);

impl MarketScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Parse a user supplied scope name.
    ///
    /// The name becomes a URL path segment, so it must be non-empty and
    /// must not contain a path separator or query delimiter.
    pub fn parse(name: &str) -> Result<Self> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidScope("scope name is empty".to_string()));
        }
        if trimmed.contains(['/', '?', '#']) {
            return Err(CoreError::InvalidScope(format!(
                "scope name contains a reserved character: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Region> for MarketScope {
    fn from(region: Region) -> Self {
        Self::new(region.name())
    }
}

/// Game region, usable as a cross-data-center scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Japan,
    NorthAmerica,
    Europe,
    Oceania,
}

impl Region {
    /// Map the game's numeric region code.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Japan),
            2 => Ok(Self::NorthAmerica),
            3 => Ok(Self::Europe),
            4 => Ok(Self::Oceania),
            other => Err(CoreError::UnknownRegion(other)),
        }
    }

    /// Name as understood by the upstream.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Japan => "Japan",
            Self::NorthAmerica => "North-America",
            Self::Europe => "Europe",
            Self::Oceania => "Oceania",
        }
    }

    /// Reverse of [`Region::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::Japan, Self::NorthAmerica, Self::Europe, Self::Oceania]
            .into_iter()
            .find(|r| r.name() == name)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a user supplied item id. Zero is never a valid item.
pub fn parse_item_id(word: &str) -> Result<u32> {
    match word.trim().parse::<u32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CoreError::InvalidItemId(word.to_string())),
    }
}

/// Identifies one cached snapshot: `(item id, scope)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub item_id: u32,
    pub scope: MarketScope,
}

impl SnapshotKey {
    pub fn new(item_id: u32, scope: MarketScope) -> Self {
        Self { item_id, scope }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.item_id, self.scope)
    }
}
