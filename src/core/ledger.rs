//! # Per-region activity ledger.
//!
//! Each region owns an [`ActivityCounter`] (one `AtomicU64`). The ledger maps
//! region ids to counters and exposes the two operations liveness needs:
//!
//! ```text
//! StreamWorker ── increment(id) ──► counter.fetch_add(1)
//! LivenessLoop ── get_and_reset(id) ──► counter.swap(0)
//! ```
//!
//! ## Rules
//! - `swap(0)` is a single atomic step: no increment is lost or counted twice.
//! - The map lock is only written when a worker (re)registers or is removed;
//!   increments and resets take the read side, so distinct regions never block each other.
//! - Workers keep their own `Arc<ActivityCounter>` and increment it without touching the map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// One region's activity counter.
#[derive(Debug, Default)]
pub struct ActivityCounter {
    count: AtomicU64,
}

impl ActivityCounter {
    /// Adds one accepted item.
    #[inline]
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns the count since the previous call and resets it to zero.
    #[inline]
    pub fn get_and_reset(&self) -> u64 {
        self.count.swap(0, Ordering::AcqRel)
    }
}

/// Concurrency-safe collection of per-region counters.
#[derive(Debug, Default)]
pub struct ActivityLedger {
    counters: RwLock<HashMap<Arc<str>, Arc<ActivityCounter>>>,
}

impl ActivityLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh zeroed counter for `region`, replacing any previous one.
    ///
    /// Called by a worker each time it starts; the returned handle is what the
    /// worker increments.
    pub fn register(&self, region: &Arc<str>) -> Arc<ActivityCounter> {
        let counter = Arc::new(ActivityCounter::default());
        self.counters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(Arc::clone(region), Arc::clone(&counter));
        counter
    }

    /// Drops the counter for `region`.
    pub fn remove(&self, region: &str) {
        self.counters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(region);
    }

    /// Increments `region`'s counter; unknown regions are ignored.
    pub fn increment(&self, region: &str) {
        if let Some(c) = self.counter(region) {
            c.increment();
        }
    }

    /// Returns and resets `region`'s count; unknown regions read as zero.
    pub fn get_and_reset(&self, region: &str) -> u64 {
        self.counter(region).map_or(0, |c| c.get_and_reset())
    }

    fn counter(&self, region: &str) -> Option<Arc<ActivityCounter>> {
        self.counters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(region)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn get_and_reset_returns_accumulated_then_zero() {
        let ledger = ActivityLedger::new();
        let nyc = id("nyc");
        ledger.register(&nyc);

        for _ in 0..7 {
            ledger.increment(&nyc);
        }
        assert_eq!(ledger.get_and_reset(&nyc), 7);
        assert_eq!(ledger.get_and_reset(&nyc), 0);

        ledger.increment(&nyc);
        assert_eq!(ledger.get_and_reset(&nyc), 1);
    }

    #[test]
    fn unknown_region_reads_zero() {
        let ledger = ActivityLedger::new();
        ledger.increment("nowhere");
        assert_eq!(ledger.get_and_reset("nowhere"), 0);
    }

    #[test]
    fn register_replaces_counter() {
        let ledger = ActivityLedger::new();
        let nyc = id("nyc");
        let old = ledger.register(&nyc);
        old.increment();

        let fresh = ledger.register(&nyc);
        assert_eq!(ledger.get_and_reset(&nyc), 0);
        fresh.increment();
        assert_eq!(ledger.get_and_reset(&nyc), 1);

        ledger.remove(&nyc);
        fresh.increment();
        assert_eq!(ledger.get_and_reset(&nyc), 0);
    }

    #[test]
    fn concurrent_regions_do_not_interfere() {
        let ledger = Arc::new(ActivityLedger::new());
        let a = ledger.register(&id("a"));
        let b = ledger.register(&id("b"));

        let threads: Vec<_> = (0..4)
            .map(|i| {
                let counter = if i % 2 == 0 { a.clone() } else { b.clone() };
                let n = if i % 2 == 0 { 10_000 } else { 7_000 };
                std::thread::spawn(move || (0..n).for_each(|_| counter.increment()))
            })
            .collect();
        threads.into_iter().for_each(|t| t.join().unwrap());

        assert_eq!(ledger.get_and_reset("a"), 20_000);
        assert_eq!(ledger.get_and_reset("b"), 14_000);
    }

    #[test]
    fn reset_under_concurrent_increments_loses_nothing() {
        let ledger = Arc::new(ActivityLedger::new());
        let counter = ledger.register(&id("sf"));
        const N: u64 = 50_000;

        let writer = std::thread::spawn(move || (0..N).for_each(|_| counter.increment()));
        let reader = {
            let ledger = Arc::clone(&ledger);
            std::thread::spawn(move || {
                let mut seen = 0;
                for _ in 0..1_000 {
                    seen += ledger.get_and_reset("sf");
                }
                seen
            })
        };

        writer.join().unwrap();
        let seen = reader.join().unwrap();
        assert_eq!(seen + ledger.get_and_reset("sf"), N);
    }
}
