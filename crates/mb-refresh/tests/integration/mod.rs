//! Integration tests for mb-refresh.
//!
//! These drive a full `MarketBoard` against scripted upstreams:
//! - Cache hits and TTL expiry
//! - Supersession and cancellation
//! - Supplemental merges and retry exhaustion

pub mod common;
