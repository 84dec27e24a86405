use crate::core::errors::{QueueError, Result};
use crate::core::key::QueueKey;
use std::collections::{HashSet, VecDeque};

/// A FIFO queue of keys awaiting a fetch, with duplicate suppression and
/// optional capacity control.
///
/// Not synchronised; the coordinator owns it behind its state lock.
#[derive(Debug)]
pub struct PendingQueue<K: QueueKey> {
    order: VecDeque<K>,
    members: HashSet<K>,
    capacity: Option<usize>,
}

impl<K: QueueKey> PendingQueue<K> {
    /// Creates a new PendingQueue; `None` leaves it unbounded
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            order: VecDeque::new(),
            members: HashSet::new(),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn bounded(capacity: usize) -> Self {
        Self::new(Some(capacity))
    }

    /// Appends a key to the back of the queue.
    ///
    /// Returns `Ok(false)` if the key is already queued and
    /// `QueueFull` if a bounded queue is at capacity (backpressure).
    pub fn push(&mut self, key: K) -> Result<bool> {
        if self.members.contains(&key) {
            return Ok(false);
        }
        if let Some(capacity) = self.capacity {
            if self.order.len() >= capacity {
                return Err(QueueError::QueueFull { capacity });
            }
        }
        self.members.insert(key.clone());
        self.order.push_back(key);
        Ok(true)
    }

    /// Removes and returns the head key
    pub fn pop(&mut self) -> Option<K> {
        let key = self.order.pop_front()?;
        self.members.remove(&key);
        Some(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.members.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drops every queued key, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.order.len();
        self.order.clear();
        self.members.clear();
        removed
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Always false for an unbounded queue
    pub fn is_full(&self) -> bool {
        self.capacity.is_some_and(|capacity| self.len() >= capacity)
    }

    /// Queued keys in dequeue order
    pub fn keys(&self) -> Vec<K> {
        self.order.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_basic_operations() {
        let mut queue = PendingQueue::bounded(3);

        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.pop(), None);

        assert!(queue.push("c1").unwrap());
        assert!(queue.push("c2").unwrap());
        assert!(queue.push("c3").unwrap());
        assert_eq!(queue.len(), 3);
        assert!(queue.is_full());

        // Capacity limit
        assert!(matches!(
            queue.push("c4"),
            Err(QueueError::QueueFull { capacity: 3 })
        ));

        assert_eq!(queue.pop(), Some("c1"));
        assert_eq!(queue.pop(), Some("c2"));
        assert_eq!(queue.len(), 1);

        assert!(queue.push("c4").unwrap());
        assert_eq!(queue.keys(), vec!["c3", "c4"]);

        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(!queue.contains(&"c3"));
    }

    #[test]
    fn test_duplicates_are_suppressed() {
        let mut queue = PendingQueue::unbounded();

        assert!(queue.push("c1".to_string()).unwrap());
        assert!(queue.push("c2".to_string()).unwrap());
        assert!(!queue.push("c1".to_string()).unwrap());
        assert_eq!(queue.len(), 2);

        // Once dequeued the key may be queued again
        assert_eq!(queue.pop().as_deref(), Some("c1"));
        assert!(queue.push("c1".to_string()).unwrap());
        assert_eq!(queue.keys(), vec!["c2".to_string(), "c1".to_string()]);
    }

    #[test]
    fn test_duplicate_on_full_queue_is_not_an_error() {
        let mut queue = PendingQueue::bounded(1);
        assert!(queue.push(7u64).unwrap());
        assert!(!queue.push(7u64).unwrap());
        assert!(queue.push(8u64).is_err());
    }

    #[test]
    fn test_unbounded_queue_never_fills() {
        let mut queue = PendingQueue::unbounded();
        for key in 1..=20_000u64 {
            assert!(queue.push(key).unwrap());
        }
        assert_eq!(queue.len(), 20_000);
        assert_eq!(queue.capacity(), None);
        assert!(!queue.is_full());
        assert_eq!(queue.pop(), Some(1));
    }
}
