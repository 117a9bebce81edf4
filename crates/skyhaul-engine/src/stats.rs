//! Best-effort operation counters.
//!
//! Bumped after a transaction commits; a missed bump never fails or rolls
//! back the primary operation.

use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

pub const FLIGHTS_STARTED: &str = "flights_started";
pub const FLIGHTS_COMPLETED: &str = "flights_completed";
pub const FLIGHTS_ABORTED: &str = "flights_aborted";
pub const JOBS_COMPLETED: &str = "jobs_completed";
pub const JOBS_ABORTED: &str = "jobs_aborted";
pub const RECORDS_POSTED: &str = "records_posted";

/// Named atomic counters.
#[derive(Default)]
pub struct Stats {
    counters: DashMap<&'static str, AtomicI64>,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self, name: &'static str) {
        self.add(name, 1);
    }

    pub fn add(&self, name: &'static str, delta: i64) {
        self.counters
            .entry(name)
            .or_insert_with(|| AtomicI64::new(0))
            .fetch_add(delta, Ordering::Relaxed);
    }

    pub fn get(&self, name: &str) -> i64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Snapshot of all counters for reporting.
    pub fn snapshot(&self) -> Vec<(&'static str, i64)> {
        let mut out: Vec<_> = self
            .counters
            .iter()
            .map(|e| (*e.key(), e.value().load(Ordering::Relaxed)))
            .collect();
        out.sort_by_key(|(name, _)| *name);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new();
        assert_eq!(stats.get(FLIGHTS_STARTED), 0);
        stats.bump(FLIGHTS_STARTED);
        stats.bump(FLIGHTS_STARTED);
        stats.add(RECORDS_POSTED, 3);
        assert_eq!(stats.get(FLIGHTS_STARTED), 2);
        assert_eq!(stats.get(RECORDS_POSTED), 3);
        assert_eq!(stats.snapshot().len(), 2);
    }
}
