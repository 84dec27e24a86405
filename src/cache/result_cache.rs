use crate::cache::entry::Entry;
use crate::core::key::QueueKey;
use async_broadcast::{InactiveReceiver, Receiver, Sender};
use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use tracing::trace;

/// Emitted once per key when its entry is written
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheUpdate<K> {
    pub key: K,
    pub failed: bool,
    /// Number of entries after the write
    pub len: usize,
}

/// Write-once map from key to settled fetch result.
///
/// Entries are never replaced or invalidated; the cache lives as long as its
/// coordinator.
pub struct ResultCache<K: QueueKey, V> {
    entries: DashMap<K, Entry<V>>,
    updates: Sender<CacheUpdate<K>>,
    // Keeps the channel open while nobody is subscribed
    _idle_rx: InactiveReceiver<CacheUpdate<K>>,
}

impl<K: QueueKey, V: Clone + Send + Sync + 'static> ResultCache<K, V> {
    pub fn new(event_capacity: usize) -> Self {
        let (mut tx, rx) = async_broadcast::broadcast(event_capacity.max(1));
        // Slow subscribers lose the oldest updates instead of stalling writers
        tx.set_overflow(true);
        Self {
            entries: DashMap::new(),
            updates: tx,
            _idle_rx: rx.deactivate(),
        }
    }

    /// Cached value for `key` (the fallback if the fetch failed)
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .and_then(|entry| entry.value().value().cloned())
    }

    pub fn entry(&self, key: &K) -> Option<Entry<V>> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Inserts an entry unless the key is already present.
    ///
    /// Returns false and leaves the existing entry untouched on a second write.
    pub fn set(&self, key: K, entry: Entry<V>) -> bool {
        let failed = entry.is_failed();
        match self.entries.entry(key.clone()) {
            MapEntry::Occupied(_) => {
                trace!(key = ?key, "Ignoring second write for cached key");
                return false;
            }
            MapEntry::Vacant(slot) => {
                slot.insert(entry);
            }
        }

        let update = CacheUpdate {
            key,
            failed,
            len: self.entries.len(),
        };
        // Err only means there are no active subscribers
        let _ = self.updates.try_broadcast(update);
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn snapshot(&self) -> HashMap<K, Entry<V>> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Receive an update for every entry written after this call
    pub fn subscribe(&self) -> Receiver<CacheUpdate<K>> {
        self.updates.new_receiver()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::FetchError;
    use std::time::Duration;

    #[test]
    fn test_write_once() {
        let cache: ResultCache<String, u32> = ResultCache::new(8);
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"c1".to_string()), None);

        assert!(cache.set("c1".to_string(), Entry::fetched(1, Duration::ZERO)));
        assert!(!cache.set("c1".to_string(), Entry::fetched(2, Duration::ZERO)));

        assert_eq!(cache.get(&"c1".to_string()), Some(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&"c1".to_string()));
    }

    #[test]
    fn test_failed_entry_serves_fallback() {
        let cache: ResultCache<&'static str, Vec<String>> = ResultCache::new(8);
        cache.set(
            "c1",
            Entry::failed(FetchError::transport("timeout"), Some(Vec::new()), Duration::ZERO),
        );

        assert_eq!(cache.get(&"c1"), Some(Vec::new()));
        assert!(cache.entry(&"c1").unwrap().is_failed());
        assert_eq!(cache.keys(), vec!["c1"]);
        assert_eq!(cache.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_see_each_write_once() {
        let cache: ResultCache<&'static str, u32> = ResultCache::new(8);
        let mut rx = cache.subscribe();

        cache.set("c1", Entry::fetched(1, Duration::ZERO));
        cache.set("c1", Entry::fetched(9, Duration::ZERO));
        cache.set(
            "c2",
            Entry::failed(FetchError::not_found("c2"), None, Duration::ZERO),
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            CacheUpdate {
                key: "c1",
                failed: false,
                len: 1
            }
        );
        let second = rx.recv().await.unwrap();
        assert_eq!(second.key, "c2");
        assert!(second.failed);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_writes_without_subscribers_do_not_fail() {
        let cache: ResultCache<u64, u64> = ResultCache::new(1);
        for id in 1..=5 {
            assert!(cache.set(id, Entry::fetched(id * 10, Duration::ZERO)));
        }
        assert_eq!(cache.len(), 5);
    }
}
