//! Result and reporting types for the fetch coordinator

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// What `load` did with a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    /// Appended to the pending queue
    Enqueued,
    /// Blank key, nothing to do
    Ignored,
    /// Already settled in the cache
    Cached,
    /// Currently being fetched
    InFlight,
    /// Already waiting in the queue
    AlreadyPending,
}

impl LoadOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, Self::Enqueued)
    }
}

/// Point-in-time view of a coordinator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoordinatorStatus<K> {
    pub pending: Vec<K>,
    pub in_flight: Option<K>,
    pub cached: usize,
    pub gate_open: bool,
    pub idle: bool,
    pub shut_down: bool,
}

#[derive(Debug, Default)]
pub(crate) struct Stats {
    pub requested: AtomicU64,
    pub enqueued: AtomicU64,
    pub skipped_blank: AtomicU64,
    pub skipped_cached: AtomicU64,
    pub skipped_duplicate: AtomicU64,
    pub skipped_on_dequeue: AtomicU64,
    pub fetched: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
    pub panicked: AtomicU64,
    pub cancelled: AtomicU64,
}

impl Stats {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let read = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            requested: read(&self.requested),
            enqueued: read(&self.enqueued),
            skipped_blank: read(&self.skipped_blank),
            skipped_cached: read(&self.skipped_cached),
            skipped_duplicate: read(&self.skipped_duplicate),
            skipped_on_dequeue: read(&self.skipped_on_dequeue),
            fetched: read(&self.fetched),
            failed: read(&self.failed),
            timed_out: read(&self.timed_out),
            panicked: read(&self.panicked),
            cancelled: read(&self.cancelled),
        }
    }
}

/// Counters accumulated over the coordinator's lifetime.
///
/// `failed` includes timed-out and panicked fetches. The `skipped_*` counters
/// other than `skipped_on_dequeue` are `load` outcomes; `skipped_on_dequeue`
/// counts pending keys the worker dropped because they were written straight
/// into the cache while they waited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub requested: u64,
    pub enqueued: u64,
    pub skipped_blank: u64,
    pub skipped_cached: u64,
    pub skipped_duplicate: u64,
    pub skipped_on_dequeue: u64,
    pub fetched: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub panicked: u64,
    pub cancelled: u64,
}

impl StatsSnapshot {
    /// Fetches that settled, successfully or not
    pub fn settled(&self) -> u64 {
        self.fetched + self.failed
    }

    pub fn failure_ratio(&self) -> f64 {
        let settled = self.settled();
        if settled == 0 {
            0.0
        } else {
            self.failed as f64 / settled as f64
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "requested": self.requested,
            "enqueued": self.enqueued,
            "skipped": {
                "blank": self.skipped_blank,
                "cached": self.skipped_cached,
                "duplicate": self.skipped_duplicate,
                "on_dequeue": self.skipped_on_dequeue,
            },
            "fetched": self.fetched,
            "failed": self.failed,
            "timed_out": self.timed_out,
            "panicked": self.panicked,
            "cancelled": self.cancelled,
            "failure_ratio": self.failure_ratio(),
        })
    }
}
