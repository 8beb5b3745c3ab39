//! Content cache metrics.
//!
//! Counters are owned by one service instance rather than a global, so
//! tests running side by side never see each other's numbers.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters for cache and store activity.
#[derive(Debug, Default)]
pub struct ContentMetrics {
    /// Requests answered from a populated cache slot
    cache_hits: AtomicUsize,

    /// Requests that found no usable slot and started a fetch
    cache_misses: AtomicUsize,

    /// Requests that joined a fetch already in flight
    coalesced: AtomicUsize,

    /// Queries issued to the content store
    store_queries: AtomicUsize,

    /// Store queries that failed
    store_failures: AtomicUsize,

    /// Resolutions served from the default language
    fallbacks: AtomicUsize,

    /// Cache slots dropped by invalidation
    invalidated: AtomicUsize,
}

impl ContentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_query(&self) {
        self.store_queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidated(&self, slots: usize) {
        self.invalidated.fetch_add(slots, Ordering::Relaxed);
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn coalesced(&self) -> usize {
        self.coalesced.load(Ordering::Relaxed)
    }

    pub fn store_queries(&self) -> usize {
        self.store_queries.load(Ordering::Relaxed)
    }

    pub fn store_failures(&self) -> usize {
        self.store_failures.load(Ordering::Relaxed)
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks.load(Ordering::Relaxed)
    }

    pub fn invalidated(&self) -> usize {
        self.invalidated.load(Ordering::Relaxed)
    }

    /// Snapshot the counters.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let coalesced = self.coalesced();
        let lookups = hits + misses + coalesced;
        let cache_hit_rate = if lookups > 0 {
            (hits as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };

        let queries = self.store_queries();
        let failures = self.store_failures();
        let store_success_rate = if queries > 0 {
            (queries.saturating_sub(failures) as f64 / queries as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            cache_hits: hits,
            cache_misses: misses,
            coalesced,
            cache_hit_rate,
            store_queries: queries,
            store_failures: failures,
            store_success_rate,
            fallbacks: self.fallbacks(),
            invalidated: self.invalidated(),
        }
    }
}

/// Point-in-time view of [`ContentMetrics`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub coalesced: usize,

    /// Share of lookups answered from cache, as a percentage (0-100)
    pub cache_hit_rate: f64,

    pub store_queries: usize,
    pub store_failures: usize,

    /// Share of store queries that succeeded, as a percentage (0-100)
    pub store_success_rate: f64,

    pub fallbacks: usize,
    pub invalidated: usize,
}
