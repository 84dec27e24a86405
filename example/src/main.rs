use anyhow::{Context, Result};
use async_trait::async_trait;
use fetchq::{CoordinatorConfig, FetchCoordinator, FetchError, Fetcher};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, Level};

/// Role ID -> role name, loaded once before any per-challenge lookup
type RoleTable = HashMap<u32, &'static str>;

async fn load_role_table() -> RoleTable {
    tokio::time::sleep(Duration::from_millis(150)).await;
    HashMap::from([(1, "Submitter"), (2, "Reviewer"), (3, "Copilot"), (4, "Manager")])
}

/// Simulated resources endpoint: one call per challenge
struct ChallengeResources {
    roles: Arc<OnceCell<RoleTable>>,
}

#[async_trait]
impl Fetcher<String, Value> for ChallengeResources {
    async fn fetch(&self, challenge_id: &String) -> Result<Value, FetchError> {
        tokio::time::sleep(Duration::from_millis(fastrand::u64(20..80))).await;

        if challenge_id.ends_with('7') {
            return Err(FetchError::http(404, format!("challenge {} not found", challenge_id)));
        }
        if fastrand::u8(0..10) == 0 {
            return Err(FetchError::http(503, "resources service unavailable"));
        }

        let table = self
            .roles
            .get()
            .ok_or_else(|| FetchError::Other("role table not loaded".to_string()))?;
        let role_id = fastrand::u32(1..=4);
        let role = table.get(&role_id).copied().unwrap_or("Unknown");
        Ok(json!([{ "challengeId": challenge_id, "roleId": role_id, "role": role }]))
    }

    fn fallback(&self, _key: &String, _error: &FetchError) -> Option<Value> {
        Some(json!([]))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fetchq::init_tracing(Level::INFO);

    let roles = Arc::new(OnceCell::new());
    let config = CoordinatorConfig::builder()
        .name("resource-roles")
        .start_gated(true)
        .fetch_timeout(Some(Duration::from_secs(2)))
        .build()?;
    let coordinator = FetchCoordinator::new(
        ChallengeResources {
            roles: roles.clone(),
        },
        config,
    )?;

    let mut updates = coordinator.subscribe();
    let renderer = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            info!(challenge = %update.key, failed = update.failed, cached = update.len, "Row updated");
        }
    });

    // Rows scroll into view faster than the backend answers
    for page in 0..4u32 {
        let ids = (0..6).map(|row| format!("300{:05}", page * 4 + row));
        let outcomes = coordinator.load_many(ids)?;
        info!(page, ?outcomes, "Page rendered");
        tokio::time::sleep(Duration::from_millis(40)).await;
    }

    let table = load_role_table().await;
    roles
        .set(table)
        .map_err(|_| anyhow::anyhow!("role table loaded twice"))?;
    coordinator.open_gate();

    // User navigates away before the last rows are fetched
    tokio::time::sleep(Duration::from_millis(300)).await;
    let dropped = coordinator.cancel();
    info!(dropped, "Navigated away");

    coordinator
        .wait_idle_timeout(Duration::from_secs(5))
        .await
        .context("waiting for in-flight fetch")?;

    let stats = coordinator.stats();
    println!("{}", serde_json::to_string_pretty(&stats.to_json())?);
    println!("{}", serde_json::to_string_pretty(&coordinator.status())?);

    coordinator.shutdown().await?;
    drop(coordinator);
    // The update channel closes once the worker has released the cache
    let _ = tokio::time::timeout(Duration::from_secs(1), renderer).await;
    Ok(())
}
