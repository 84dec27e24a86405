use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors raised at the coordinator boundary.
///
/// Fetch failures never surface here; they are absorbed into cache entries
/// as [`FetchError`] values.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue full: capacity {capacity} reached")]
    QueueFull { capacity: usize },

    #[error("Coordinator has been shut down")]
    Shutdown,

    #[error("No tokio runtime available to spawn the fetch worker")]
    NoRuntime,

    #[error("Configuration invalid: {0}")]
    InvalidConfiguration(String),

    #[error("Failed to read configuration from {path}")]
    ConfigRead {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Coordinator did not become idle within {0:?}")]
    IdleTimeout(Duration),

    #[error("Fetch worker stopped unexpectedly")]
    WorkerStopped,

    #[error("Fetch worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl QueueError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Backpressure conditions a caller may retry once the queue drains
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::IdleTimeout(_))
    }
}

/// Result type alias for QueueError
pub type Result<T> = std::result::Result<T, QueueError>;

/// Coarse classification of a failed fetch.
///
/// The coordinator never retries, whatever the kind; it is recorded so callers
/// can tell a missing resource from an outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Rejected,
    Transient,
    Internal,
}

/// Error returned by a [`Fetcher`](crate::Fetcher).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Fetch panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::NotFound,
            Self::Http { status: 404, .. } => FailureKind::NotFound,
            Self::Http { status, .. } if (400..500).contains(status) => FailureKind::Rejected,
            Self::Http { .. } | Self::Transport(_) | Self::Timeout(_) => FailureKind::Transient,
            Self::Panicked(_) | Self::Other(_) => FailureKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FailureKind::NotFound
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(e: anyhow::Error) -> Self {
        FetchError::Other(format!("{:#}", e))
    }
}

impl From<io::Error> for FetchError {
    fn from(e: io::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Other(format!("invalid payload: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classification() {
        assert_eq!(FetchError::not_found("c1").kind(), FailureKind::NotFound);
        assert_eq!(FetchError::http(404, "missing").kind(), FailureKind::NotFound);
        assert_eq!(FetchError::http(403, "forbidden").kind(), FailureKind::Rejected);
        assert_eq!(FetchError::http(503, "unavailable").kind(), FailureKind::Transient);
        assert_eq!(FetchError::transport("reset").kind(), FailureKind::Transient);
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(1)).kind(),
            FailureKind::Transient
        );
        assert_eq!(FetchError::Panicked("boom".into()).kind(), FailureKind::Internal);
        assert!(FetchError::http(404, "").is_not_found());
        assert!(!FetchError::transport("reset").is_not_found());
    }

    #[test]
    fn test_from_anyhow_keeps_context() {
        let err = anyhow::anyhow!("connection refused").context("loading roles");
        match FetchError::from(err) {
            FetchError::Other(msg) => {
                assert!(msg.contains("loading roles"));
                assert!(msg.contains("connection refused"));
            }
            other => panic!("Expected Other, got {:?}", other),
        }
    }

    #[test]
    fn test_queue_error_display() {
        let err = QueueError::QueueFull { capacity: 16 };
        assert!(err.to_string().contains("16"));
        assert!(err.is_transient());
        assert!(!QueueError::Shutdown.is_transient());
        assert!(!QueueError::WorkerStopped.is_transient());
    }
}
