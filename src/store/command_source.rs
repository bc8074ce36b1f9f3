//! Dashboard command draining (spec.md §6): commands are written to the
//! `commands` collection by the dashboard and drained by the kernel at
//! step boundaries, FIFO by `ts`.

use crate::store::config_store::ConfigStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandKind {
    Pause,
    Resume,
    SetGoal { goal_id: String, patch: Value },
    SetPolicy { policy_id: String, patch: Value },
    InjectEvent { topic: String, payload: Value },
    SetParam { path: String, value: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub id: String,
    pub ts: i64,
    #[serde(flatten)]
    pub kind: CommandKind,
}

#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Returns pending commands in FIFO order by `ts` and marks them
    /// consumed so a later drain doesn't redeliver them.
    async fn drain_pending(&self) -> Vec<Command>;
}

/// Drains the `commands` collection of a `ConfigStore`, ordering by
/// `ts` and removing each document once read.
pub struct PollingCommandSource {
    store: Arc<dyn ConfigStore>,
}

impl PollingCommandSource {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        PollingCommandSource { store }
    }
}

#[async_trait]
impl CommandSource for PollingCommandSource {
    async fn drain_pending(&self) -> Vec<Command> {
        let mut pending: Vec<Command> = self
            .store
            .list_collection("commands")
            .await
            .into_iter()
            .filter_map(|v| serde_json::from_value::<Command>(v).ok())
            .collect();
        pending.sort_by_key(|c| c.ts);
        for command in &pending {
            self.store.delete_document("commands", &command.id).await;
        }
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::config_store::InMemoryConfigStore;

    #[tokio::test]
    async fn drains_in_ts_order_and_clears() {
        let store: Arc<dyn ConfigStore> = Arc::new(InMemoryConfigStore::new());
        store
            .put_document(
                "commands",
                "c2",
                serde_json::json!({"id": "c2", "ts": 20, "kind": "pause"}),
            )
            .await;
        store
            .put_document(
                "commands",
                "c1",
                serde_json::json!({"id": "c1", "ts": 10, "kind": "resume"}),
            )
            .await;

        let source = PollingCommandSource::new(store.clone());
        let drained = source.drain_pending().await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].id, "c1");
        assert_eq!(drained[1].id, "c2");
        assert!(store.list_collection("commands").await.is_empty());
    }
}
