//! # fetchq: sequential, deduplicated per-key fetching
//!
//! Keys (challenge IDs, member handles, ...) are `load`ed as they come into
//! view. Each distinct key is fetched exactly once, one fetch at a time, in
//! the order it was requested. Results, including failures, settle into a
//! write-once cache that consumers read and subscribe to.
//!
//! ```rust,no_run
//! use fetchq::{fetch_fn, CoordinatorConfig, FetchCoordinator, FetchError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = fetch_fn(|challenge_id: String| async move {
//!         Ok::<_, FetchError>(vec![format!("roles for {}", challenge_id)])
//!     })
//!     .with_fallback(|_, _| Some(Vec::new()));
//!
//!     let roles = FetchCoordinator::new(fetcher, CoordinatorConfig::default())?;
//!     roles.load("c1".to_string())?;
//!     roles.wait_idle().await;
//!     println!("{:?}", roles.get(&"c1".to_string()));
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod coordinator;
pub mod core;
pub mod queue;

pub use crate::cache::{CacheUpdate, Entry, Outcome, ResultCache};
pub use crate::coordinator::{
    fetch_fn, CoordinatorStatus, FetchCoordinator, Fetcher, FnFetcher, LoadOutcome, StatsSnapshot,
};
pub use crate::core::telemetry::init_tracing;
pub use crate::core::{
    CoordinatorConfig, CoordinatorConfigBuilder, FailureKind, FetchError, QueueError, QueueKey,
    Result,
};
pub use crate::queue::{Gate, InFlightGuard, PendingQueue};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct ResourceRoles;

    #[async_trait]
    impl Fetcher<String, Value> for ResourceRoles {
        async fn fetch(&self, key: &String) -> std::result::Result<Value, FetchError> {
            if key.starts_with("missing") {
                return Err(FetchError::http(404, format!("no resources for {}", key)));
            }
            Ok(json!([{ "challengeId": key, "role": "Submitter" }]))
        }

        fn fallback(&self, _key: &String, _error: &FetchError) -> Option<Value> {
            Some(json!([]))
        }
    }

    #[tokio::test]
    async fn test_coordinator_round_trip() {
        let coordinator = FetchCoordinator::new(ResourceRoles, CoordinatorConfig::development())
            .expect("coordinator");

        let outcomes = coordinator
            .load_many(vec![
                "30054321".to_string(),
                "missing-1".to_string(),
                String::new(),
            ])
            .unwrap();
        assert_eq!(
            outcomes,
            vec![
                LoadOutcome::Enqueued,
                LoadOutcome::Enqueued,
                LoadOutcome::Ignored
            ]
        );

        coordinator
            .wait_idle_timeout(Duration::from_secs(2))
            .await
            .expect("coordinator did not drain");

        let roles = coordinator.get(&"30054321".to_string()).unwrap();
        assert_eq!(roles[0]["role"], "Submitter");

        let missing = coordinator.entry(&"missing-1".to_string()).unwrap();
        assert_eq!(missing.failure_kind(), Some(FailureKind::NotFound));
        assert_eq!(missing.value(), Some(&json!([])));

        let stats = coordinator.stats();
        assert_eq!(stats.fetched, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.skipped_blank, 1);

        coordinator.shutdown().await.unwrap();
        assert!(matches!(
            coordinator.load("30054322".to_string()),
            Err(QueueError::Shutdown)
        ));
    }

    #[test]
    fn test_new_requires_runtime() {
        let result = FetchCoordinator::<String, Value>::new(ResourceRoles, CoordinatorConfig::default());
        assert!(matches!(result, Err(QueueError::NoRuntime)));
    }

    #[test]
    fn test_load_fails_once_worker_is_gone() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let coordinator = runtime
            .block_on(async { FetchCoordinator::new(ResourceRoles, CoordinatorConfig::default()) })
            .unwrap();

        // Tearing down the runtime cancels the worker task
        drop(runtime);

        assert!(matches!(
            coordinator.load("30054321".to_string()),
            Err(QueueError::WorkerStopped)
        ));
        assert!(!coordinator.is_shut_down());
    }
}
