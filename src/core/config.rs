use crate::core::errors::{QueueError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Coordinator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Name attached to the worker span and log lines
    pub name: String,
    /// Maximum number of keys waiting in the pending queue (None = unbounded)
    pub queue_capacity: Option<usize>,
    /// Per-fetch timeout in milliseconds (None = unbounded)
    pub fetch_timeout_ms: Option<u64>,
    /// Buffered cache updates per subscriber before the oldest are dropped
    pub event_capacity: usize,
    /// Start with the prerequisite gate closed
    pub start_gated: bool,
    /// How long shutdown waits for the in-flight fetch
    pub shutdown_grace_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: "fetchq".to_string(),
            queue_capacity: None,
            fetch_timeout_ms: Some(30_000),
            event_capacity: 1_024,
            start_gated: false,
            shutdown_grace_ms: 5_000,
        }
    }
}

impl CoordinatorConfig {
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(QueueError::configuration("name cannot be empty"));
        }
        if self.queue_capacity == Some(0) {
            return Err(QueueError::configuration(
                "queue_capacity must be greater than 0 when set",
            ));
        }
        if self.event_capacity == 0 {
            return Err(QueueError::configuration(
                "event_capacity must be greater than 0",
            ));
        }
        if self.fetch_timeout_ms == Some(0) {
            return Err(QueueError::configuration(
                "fetch_timeout_ms must be greater than 0 when set",
            ));
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    /// Short timeouts for local development and tests
    pub fn development() -> Self {
        Self {
            fetch_timeout_ms: Some(5_000),
            event_capacity: 64,
            shutdown_grace_ms: 500,
            ..Default::default()
        }
    }

    /// Tight limits for shared backends that must not be flooded
    pub fn conservative() -> Self {
        Self {
            queue_capacity: Some(500),
            fetch_timeout_ms: Some(10_000),
            event_capacity: 128,
            ..Default::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| QueueError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }
}

/// Builder for CoordinatorConfig
pub struct CoordinatorConfigBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Bound the pending queue; `load` of a new key past the bound fails
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    pub fn fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.fetch_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    pub fn start_gated(mut self, gated: bool) -> Self {
        self.config.start_gated = gated;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.config.shutdown_grace_ms = grace.as_millis() as u64;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<CoordinatorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for CoordinatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
