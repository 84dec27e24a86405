use crate::core::errors::{FailureKind, FetchError};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// How a fetch settled
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<V> {
    Fetched(V),
    /// The fetch failed; `fallback` is what consumers render instead
    Failed {
        error: FetchError,
        fallback: Option<V>,
    },
}

/// A settled cache entry
#[derive(Debug, Clone)]
pub struct Entry<V> {
    pub outcome: Outcome<V>,
    pub settled_at: DateTime<Utc>,
    pub latency: Duration,
}

impl<V> Entry<V> {
    pub fn fetched(value: V, latency: Duration) -> Self {
        Self {
            outcome: Outcome::Fetched(value),
            settled_at: Utc::now(),
            latency,
        }
    }

    pub fn failed(error: FetchError, fallback: Option<V>, latency: Duration) -> Self {
        Self {
            outcome: Outcome::Failed { error, fallback },
            settled_at: Utc::now(),
            latency,
        }
    }

    /// The fetched value, or the fallback of a failed fetch
    pub fn value(&self) -> Option<&V> {
        match &self.outcome {
            Outcome::Fetched(v) => Some(v),
            Outcome::Failed { fallback, .. } => fallback.as_ref(),
        }
    }

    pub fn into_value(self) -> Option<V> {
        match self.outcome {
            Outcome::Fetched(v) => Some(v),
            Outcome::Failed { fallback, .. } => fallback,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.outcome {
            Outcome::Failed { error, .. } => Some(error),
            Outcome::Fetched(_) => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error().map(FetchError::kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetched_entry() {
        let entry = Entry::fetched(vec!["Submitter"], Duration::from_millis(12));
        assert!(!entry.is_failed());
        assert_eq!(entry.value(), Some(&vec!["Submitter"]));
        assert!(entry.error().is_none());
        assert_eq!(entry.into_value(), Some(vec!["Submitter"]));
    }

    #[test]
    fn test_failed_entry_exposes_fallback() {
        let entry: Entry<Vec<&str>> = Entry::failed(
            FetchError::http(404, "no resources"),
            Some(Vec::new()),
            Duration::ZERO,
        );
        assert!(entry.is_failed());
        assert_eq!(entry.value(), Some(&Vec::new()));
        assert_eq!(entry.failure_kind(), Some(FailureKind::NotFound));

        let bare: Entry<u32> =
            Entry::failed(FetchError::transport("reset"), None, Duration::ZERO);
        assert_eq!(bare.value(), None);
        assert_eq!(bare.failure_kind(), Some(FailureKind::Transient));
    }
}
