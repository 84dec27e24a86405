//! FetchCoordinator - sequential, deduplicated per-key fetching
//!
//! Callers `load` keys as they come into view; a single worker fetches each
//! distinct key exactly once, in FIFO order, and settles the result into a
//! write-once cache that consumers read and subscribe to.

use crate::cache::{CacheUpdate, Entry, ResultCache};
use crate::coordinator::fetcher::Fetcher;
use crate::coordinator::types::{CoordinatorStatus, LoadOutcome, Stats, StatsSnapshot};
use crate::coordinator::worker::{drain_loop, Shared};
use crate::core::config::CoordinatorConfig;
use crate::core::errors::{QueueError, Result};
use crate::core::key::QueueKey;
use async_broadcast::Receiver;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Owns the pending queue, in-flight guard, result cache and worker task for
/// one logical session.
///
/// Construct one per session and hand out references; there is no global
/// instance. Dropping it stops the worker after its current fetch.
pub struct FetchCoordinator<K: QueueKey, V> {
    id: Uuid,
    config: Arc<CoordinatorConfig>,
    shared: Arc<Shared<K, V>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> FetchCoordinator<K, V>
where
    K: QueueKey,
    V: Clone + Send + Sync + 'static,
{
    /// Validate `config` and spawn the worker on the current tokio runtime
    pub fn new<F: Fetcher<K, V>>(fetcher: F, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| QueueError::NoRuntime)?;

        let id = Uuid::new_v4();
        let shared = Arc::new(Shared::new(
            config.queue_capacity,
            config.event_capacity,
            !config.start_gated,
            config.fetch_timeout(),
        ));

        let span = info_span!("fetch_worker", coordinator = %config.name, id = %id);
        let handle = runtime.spawn(drain_loop(shared.clone(), fetcher).instrument(span));

        info!(
            coordinator = %config.name,
            id = %id,
            queue_capacity = ?config.queue_capacity,
            gated = config.start_gated,
            "Initialized FetchCoordinator"
        );

        Ok(Self {
            id,
            config: Arc::new(config),
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn with_defaults<F: Fetcher<K, V>>(fetcher: F) -> Result<Self> {
        Self::new(fetcher, CoordinatorConfig::default())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Request `key`.
    ///
    /// Blank, cached, in-flight and already pending keys are no-ops. Fetch
    /// failures are never reported here; they land in the cache. Fails only
    /// after shutdown, when a configured queue bound is reached, or if the
    /// worker task has died.
    pub fn load(&self, key: K) -> Result<LoadOutcome> {
        if self.shared.is_shut_down() {
            return Err(QueueError::Shutdown);
        }
        if self.worker_stopped() {
            warn!(coordinator = %self.config.name, "Load rejected, fetch worker is gone");
            return Err(QueueError::WorkerStopped);
        }
        let stats = &self.shared.stats;
        Stats::bump(&stats.requested);

        if key.is_blank() {
            Stats::bump(&stats.skipped_blank);
            return Ok(LoadOutcome::Ignored);
        }

        let outcome = {
            let mut state = self.shared.state.lock();
            // shutdown sets the flag before cancel takes this lock
            if self.shared.is_shut_down() {
                return Err(QueueError::Shutdown);
            }
            if self.shared.cache.contains(&key) {
                LoadOutcome::Cached
            } else if state.in_flight.is(&key) {
                LoadOutcome::InFlight
            } else if state.pending.push(key.clone())? {
                self.shared.idle.send_replace(false);
                LoadOutcome::Enqueued
            } else {
                LoadOutcome::AlreadyPending
            }
        };

        match outcome {
            LoadOutcome::Enqueued => {
                Stats::bump(&stats.enqueued);
                debug!(coordinator = %self.config.name, key = ?key, "Enqueued");
                self.shared.wake.notify_one();
            }
            LoadOutcome::Cached => Stats::bump(&stats.skipped_cached),
            _ => Stats::bump(&stats.skipped_duplicate),
        }
        Ok(outcome)
    }

    /// `load` each key in order, stopping at the first boundary error
    pub fn load_many<I>(&self, keys: I) -> Result<Vec<LoadOutcome>>
    where
        I: IntoIterator<Item = K>,
    {
        keys.into_iter().map(|key| self.load(key)).collect()
    }

    /// Drop every key not yet dequeued.
    ///
    /// The in-flight fetch, if any, still completes and settles into the cache.
    pub fn cancel(&self) -> usize {
        let removed = {
            let mut state = self.shared.state.lock();
            let removed = state.pending.clear();
            if !state.in_flight.is_busy() {
                self.shared.idle.send_replace(true);
            }
            removed
        };
        Stats::add(&self.shared.stats.cancelled, removed as u64);
        if removed > 0 {
            info!(coordinator = %self.config.name, removed, "Cancelled pending fetches");
        }
        removed
    }

    /// Cached value for `key` (the fallback if its fetch failed)
    pub fn get(&self, key: &K) -> Option<V> {
        self.shared.cache.get(key)
    }

    pub fn entry(&self, key: &K) -> Option<Entry<V>> {
        self.shared.cache.entry(key)
    }

    pub fn cache(&self) -> &ResultCache<K, V> {
        &self.shared.cache
    }

    /// Updates for every cache write after this call
    pub fn subscribe(&self) -> Receiver<CacheUpdate<K>> {
        self.shared.cache.subscribe()
    }

    /// Mark the dependent lookup data available; queued keys start draining
    pub fn open_gate(&self) {
        debug!(coordinator = %self.config.name, "Gate opened");
        self.shared.gate.open();
    }

    /// Defer further fetches. Does not interrupt the in-flight fetch.
    pub fn close_gate(&self) {
        debug!(coordinator = %self.config.name, "Gate closed");
        self.shared.gate.close();
    }

    pub fn gate_open(&self) -> bool {
        self.shared.gate.is_open()
    }

    pub fn is_idle(&self) -> bool {
        *self.shared.idle.borrow()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.is_shut_down()
    }

    /// True if the worker task ended without a shutdown
    fn worker_stopped(&self) -> bool {
        let finished = self
            .worker
            .lock()
            .as_ref()
            .is_some_and(|handle| handle.is_finished());
        // The flag is always raised before a shutdown lets the worker exit
        finished && !self.shared.is_shut_down()
    }

    pub fn status(&self) -> CoordinatorStatus<K> {
        let state = self.shared.state.lock();
        CoordinatorStatus {
            pending: state.pending.keys(),
            in_flight: state.in_flight.current().cloned(),
            cached: self.shared.cache.len(),
            gate_open: self.shared.gate.is_open(),
            idle: *self.shared.idle.borrow(),
            shut_down: self.shared.is_shut_down(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Resolves once nothing is pending and nothing is in flight.
    ///
    /// Never resolves while keys wait behind a closed gate.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.idle.subscribe();
        // The sender lives in `shared`, so the channel cannot close here
        let _ = rx.wait_for(|idle| *idle).await;
    }

    pub async fn wait_idle_timeout(&self, limit: Duration) -> Result<()> {
        tokio::time::timeout(limit, self.wait_idle())
            .await
            .map_err(|_| QueueError::IdleTimeout(limit))
    }

    /// Stop accepting loads, drop pending keys and wait for the worker.
    ///
    /// The in-flight fetch gets `shutdown_grace` to settle before the worker
    /// is aborted. Calling this twice is a no-op.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shared.shutdown.send_replace(true) {
            return Ok(());
        }
        info!(coordinator = %self.config.name, "Initiating shutdown");

        let dropped = self.cancel();
        self.shared.wake.notify_one();

        let handle = self.worker.lock().take();
        if let Some(mut handle) = handle {
            let grace = self.config.shutdown_grace();
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(joined) => joined?,
                Err(_) => {
                    warn!(
                        coordinator = %self.config.name,
                        grace_ms = grace.as_millis() as u64,
                        "In-flight fetch outlived shutdown grace, aborting worker"
                    );
                    handle.abort();
                    let mut state = self.shared.state.lock();
                    if let Some(key) = state.in_flight.clear() {
                        debug!(coordinator = %self.config.name, key = ?key, "Abandoned in-flight fetch");
                    }
                    self.shared.idle.send_replace(true);
                }
            }
        }

        info!(coordinator = %self.config.name, dropped, "Shutdown complete");
        Ok(())
    }
}

impl<K: QueueKey, V> Drop for FetchCoordinator<K, V> {
    fn drop(&mut self) {
        // Worker exits after its current fetch
        self.shared.shutdown.send_replace(true);
        self.shared.wake.notify_one();
    }
}
