use crate::core::key::QueueKey;

/// Tracks the single key whose fetch is currently executing.
#[derive(Debug)]
pub struct InFlightGuard<K: QueueKey> {
    current: Option<K>,
}

impl<K: QueueKey> InFlightGuard<K> {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Marks `key` in flight. Returns false if another fetch is already running.
    pub fn try_begin(&mut self, key: K) -> bool {
        if self.current.is_some() {
            return false;
        }
        self.current = Some(key);
        true
    }

    /// Clears the guard if `key` is the in-flight key
    pub fn finish(&mut self, key: &K) -> bool {
        if self.current.as_ref() == Some(key) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Releases the guard whatever key holds it
    pub fn clear(&mut self) -> Option<K> {
        self.current.take()
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    pub fn is(&self, key: &K) -> bool {
        self.current.as_ref() == Some(key)
    }

    pub fn current(&self) -> Option<&K> {
        self.current.as_ref()
    }
}

impl<K: QueueKey> Default for InFlightGuard<K> {
    fn default() -> Self {
        Self::new()
    }
}
