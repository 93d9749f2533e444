//! Per-document request counters.
//!
//! - `fetch`: origin hit
//! - `cache`: served from the store or the recent-lookup memo
//! - `refresh`: revalidated against the origin, 304 or replaced
//! - `block`: request denied by the whitelist/scheme policy

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct Counter {
    fetch: AtomicU64,
    cache: AtomicU64,
    refresh: AtomicU64,
    block: AtomicU64,
}

/// Point-in-time copy of a [`Counter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub fetch: u64,
    pub cache: u64,
    pub refresh: u64,
    pub block: u64,
}

impl Counter {
    pub fn record_fetch(&self) {
        self.fetch.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache(&self) {
        self.cache.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refresh(&self) {
        self.refresh.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block(&self) {
        self.block.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            fetch: self.fetch.load(Ordering::Relaxed),
            cache: self.cache.load(Ordering::Relaxed),
            refresh: self.refresh.load(Ordering::Relaxed),
            block: self.block.load(Ordering::Relaxed),
        }
    }

    /// Zero every counter; called at the start of each top-level page load.
    pub fn reset(&self) {
        self.fetch.store(0, Ordering::Relaxed);
        self.cache.store(0, Ordering::Relaxed);
        self.refresh.store(0, Ordering::Relaxed);
        self.block.store(0, Ordering::Relaxed);
    }
}
