//! Core domain types for the market board.
//!
//! This crate provides the types shared by every other crate:
//! - `MarketScope`, `SnapshotKey`: what a snapshot was fetched for
//! - `Listing`, `HistoryEntry`: immutable market rows
//! - `Snapshot`: one fetched bundle, stamped with the local fetch time
//! - `Clock`: injectable time source used for staleness decisions

pub mod clock;
pub mod error;
pub mod scope;
pub mod snapshot;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result};
pub use scope::{parse_item_id, MarketScope, Region, SnapshotKey};
pub use snapshot::{HistoryEntry, Listing, MarketData, Snapshot};
