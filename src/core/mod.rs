// Core infrastructure shared by the queue, cache and coordinator

pub mod config;
pub mod errors;
pub mod key;
pub mod telemetry;

pub use config::{CoordinatorConfig, CoordinatorConfigBuilder};
pub use errors::{FailureKind, FetchError, QueueError, Result};
pub use key::QueueKey;
