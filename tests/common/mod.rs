//! Shared helpers for the integration tests
//!
//! `DataGen` builds seeded, reproducible entity populations; the store
//! wrappers inject latency or failures around a `MemoryStore`.

#![allow(dead_code)]

pub mod datagen;
pub mod stores;

pub use datagen::DataGen;
pub use stores::{FailingStore, SlowStore};

use chrono::{DateTime, TimeZone, Utc};
use idgraph::{MemoryStore, ResolveApi, ResolverConfig};
use std::sync::Arc;

pub fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

/// An API over a fresh in-memory store with default configuration
pub fn memory_api() -> ResolveApi {
    ResolveApi::new(Arc::new(MemoryStore::new()), ResolverConfig::default())
}
