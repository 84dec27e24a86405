//! The single drain loop behind each coordinator.
//!
//! One worker task per coordinator pops the head key, fetches it, settles the
//! result and moves on, so fetches run strictly one at a time in FIFO order.

use crate::cache::{Entry, ResultCache};
use crate::coordinator::fetcher::Fetcher;
use crate::coordinator::types::Stats;
use crate::core::errors::FetchError;
use crate::core::key::QueueKey;
use crate::queue::{Gate, InFlightGuard, PendingQueue};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

pub(crate) struct DrainState<K: QueueKey> {
    pub pending: PendingQueue<K>,
    pub in_flight: InFlightGuard<K>,
}

/// State shared between the coordinator handle and its worker
pub(crate) struct Shared<K: QueueKey, V> {
    pub state: Mutex<DrainState<K>>,
    pub cache: ResultCache<K, V>,
    pub gate: Gate,
    pub wake: Notify,
    pub idle: watch::Sender<bool>,
    pub shutdown: watch::Sender<bool>,
    pub stats: Stats,
    pub fetch_timeout: Option<Duration>,
}

impl<K: QueueKey, V: Clone + Send + Sync + 'static> Shared<K, V> {
    pub fn new(
        queue_capacity: Option<usize>,
        event_capacity: usize,
        gate_open: bool,
        fetch_timeout: Option<Duration>,
    ) -> Self {
        Self {
            state: Mutex::new(DrainState {
                pending: PendingQueue::new(queue_capacity),
                in_flight: InFlightGuard::new(),
            }),
            cache: ResultCache::new(event_capacity),
            gate: Gate::new(gate_open),
            wake: Notify::new(),
            idle: watch::channel(true).0,
            shutdown: watch::channel(false).0,
            stats: Stats::default(),
            fetch_timeout,
        }
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Dequeues the next uncached key and marks it in flight
    fn next_key(&self) -> Option<K> {
        let mut state = self.state.lock();
        while let Some(key) = state.pending.pop() {
            // Written directly through the cache while it waited
            if self.cache.contains(&key) {
                Stats::bump(&self.stats.skipped_on_dequeue);
                continue;
            }
            let began = state.in_flight.try_begin(key.clone());
            debug_assert!(began, "in-flight guard held between fetches");
            return Some(key);
        }
        self.idle.send_replace(true);
        None
    }

    /// Writes the entry and releases the in-flight guard in one step
    fn settle(&self, key: K, entry: Entry<V>) {
        let mut state = self.state.lock();
        self.cache.set(key.clone(), entry);
        state.in_flight.finish(&key);
        if state.pending.is_empty() {
            self.idle.send_replace(true);
        }
    }
}

pub(crate) async fn drain_loop<K, V, F>(shared: Arc<Shared<K, V>>, fetcher: F)
where
    K: QueueKey,
    V: Clone + Send + Sync + 'static,
    F: Fetcher<K, V>,
{
    let mut shutdown_rx = shared.shutdown.subscribe();
    info!("Fetch worker started");

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        if !shared.gate.is_open() {
            debug!("Prerequisite gate closed, deferring drain");
            tokio::select! {
                _ = shared.gate.wait_open() => {}
                _ = shutdown_rx.changed() => {}
            }
            continue;
        }

        let Some(key) = shared.next_key() else {
            tokio::select! {
                _ = shared.wake.notified() => {}
                _ = shutdown_rx.changed() => {}
            }
            continue;
        };

        debug!(key = ?key, "Fetching");
        let entry = fetch_one(&shared, &fetcher, &key).await;
        shared.settle(key, entry);
    }

    info!("Fetch worker stopped");
}

async fn fetch_one<K, V, F>(shared: &Shared<K, V>, fetcher: &F, key: &K) -> Entry<V>
where
    K: QueueKey,
    V: Clone + Send + Sync + 'static,
    F: Fetcher<K, V>,
{
    let started = Instant::now();
    let guarded = AssertUnwindSafe(fetcher.fetch(key)).catch_unwind();

    let result = match shared.fetch_timeout {
        Some(limit) => match tokio::time::timeout(limit, guarded).await {
            Ok(caught) => caught,
            Err(_) => {
                Stats::bump(&shared.stats.timed_out);
                Ok(Err(FetchError::Timeout(limit)))
            }
        },
        None => guarded.await,
    };

    let result = result.unwrap_or_else(|panic| {
        Stats::bump(&shared.stats.panicked);
        Err(FetchError::Panicked(panic_message(&*panic)))
    });

    let latency = started.elapsed();
    match result {
        Ok(value) => {
            Stats::bump(&shared.stats.fetched);
            debug!(key = ?key, latency_ms = latency.as_millis() as u64, "Fetch settled");
            Entry::fetched(value, latency)
        }
        Err(error) => {
            Stats::bump(&shared.stats.failed);
            warn!(
                key = ?key,
                error = %error,
                kind = ?error.kind(),
                "Fetch failed, caching fallback"
            );
            let fallback = std::panic::catch_unwind(AssertUnwindSafe(|| {
                fetcher.fallback(key, &error)
            }))
            .unwrap_or_else(|panic| {
                warn!(
                    key = ?key,
                    panic = %panic_message(&*panic),
                    "Fallback panicked, caching failure without a value"
                );
                None
            });
            Entry::failed(error, fallback, latency)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
