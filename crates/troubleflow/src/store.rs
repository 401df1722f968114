//! Storage boundary and per-flow serialization of edits.
//!
//! The merge engine is pure; the read-merge-write cycle around it is not.
//! [`FlowEditor`] runs that cycle under a per-id lock so two concurrent edits
//! of one flow cannot both read the same base and lose each other's changes.
//! Edits of different flows never wait on each other.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::error::FlowError;
use crate::flow::Flow;
use crate::merge::MergeEngine;

/// Persistence collaborator for flow documents.
#[async_trait]
pub trait FlowStore: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<Flow>, FlowError>;

    /// Overwrites the stored document with the same id.
    async fn save(&self, flow: &Flow) -> Result<(), FlowError>;
}

#[async_trait]
impl<S: FlowStore + ?Sized> FlowStore for Arc<S> {
    async fn load(&self, id: &str) -> Result<Option<Flow>, FlowError> {
        (**self).load(id).await
    }

    async fn save(&self, flow: &Flow) -> Result<(), FlowError> {
        (**self).save(flow).await
    }
}

/// Map-backed store for tests and single-process use.
#[derive(Debug, Default)]
pub struct InMemoryFlowStore {
    flows: RwLock<HashMap<String, Flow>>,
}

impl InMemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.flows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.flows.read().await.is_empty()
    }
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn load(&self, id: &str) -> Result<Option<Flow>, FlowError> {
        Ok(self.flows.read().await.get(id).cloned())
    }

    async fn save(&self, flow: &Flow) -> Result<(), FlowError> {
        self.flows
            .write()
            .await
            .insert(flow.id.clone(), flow.clone());
        Ok(())
    }
}

/// Registry of per-flow-id locks.
#[derive(Debug, Default)]
pub struct FlowLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FlowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `id`. Released when the guard drops.
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Removes the entry for `id` once no task holds or waits on it.
    pub async fn release(&self, id: &str) {
        let mut locks = self.locks.lock().await;
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }

    /// Drops the entries no task currently holds or waits on.
    pub async fn prune(&self) {
        self.locks
            .lock()
            .await
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

/// Runs load → merge → save for one flow at a time.
pub struct FlowEditor<S> {
    store: S,
    locks: FlowLocks,
    engine: MergeEngine,
}

impl<S: FlowStore> FlowEditor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: FlowLocks::new(),
            engine: MergeEngine::new(),
        }
    }

    pub fn with_engine(mut self, engine: MergeEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persists a newly synthesized flow.
    pub async fn create(&self, flow: &Flow) -> Result<(), FlowError> {
        let result = {
            let _guard = self.locks.acquire(&flow.id).await;
            self.store.save(flow).await
        };
        self.locks.release(&flow.id).await;
        result
    }

    /// Merges `update` into the stored flow `id` and persists the result.
    pub async fn apply_update(
        &self,
        id: &str,
        update: JsonValue,
        updated_by: &str,
    ) -> Result<Flow, FlowError> {
        let merged = self
            .edit(id, |base| self.engine.merge(base, update, updated_by))
            .await?;
        debug!(flow_id = %id, "update persisted");
        Ok(merged)
    }

    /// Renames one step of the stored flow `id`.
    pub async fn update_step_title(
        &self,
        id: &str,
        step_id: &str,
        title: &str,
        updated_by: &str,
    ) -> Result<Flow, FlowError> {
        self.edit(id, |base| {
            self.engine
                .update_step_title(base, step_id, title, updated_by)
        })
        .await
    }

    /// Load, apply `change`, save; all under the lock for `id`, which is
    /// released from the registry afterwards.
    async fn edit<F>(&self, id: &str, change: F) -> Result<Flow, FlowError>
    where
        F: FnOnce(&Flow) -> Result<Flow, FlowError>,
    {
        let result = {
            let _guard = self.locks.acquire(id).await;
            async {
                let base = self.load_existing(id).await?;
                let merged = change(&base)?;
                self.store.save(&merged).await?;
                Ok::<_, FlowError>(merged)
            }
            .await
        };
        self.locks.release(id).await;
        result
    }

    async fn load_existing(&self, id: &str) -> Result<Flow, FlowError> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| FlowError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flow(id: &str) -> Flow {
        serde_json::from_value(json!({
            "id": id,
            "title": "t",
            "steps": [{"id": "step_1", "title": "a", "description": "a", "message": "a"}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_store_round_trip() {
        let store = InMemoryFlowStore::new();
        assert!(store.is_empty().await);
        store.save(&flow("flow_1")).await.unwrap();
        assert_eq!(store.load("flow_1").await.unwrap(), Some(flow("flow_1")));
        assert_eq!(store.load("flow_2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_of_missing_flow_is_not_found() {
        let editor = FlowEditor::new(InMemoryFlowStore::new());
        let result = editor.apply_update("flow_x", json!({"title": "y"}), "u").await;
        assert!(matches!(result, Err(FlowError::NotFound(id)) if id == "flow_x"));
    }

    #[tokio::test]
    async fn test_apply_update_persists() {
        let editor = FlowEditor::new(InMemoryFlowStore::new());
        editor.create(&flow("flow_1")).await.unwrap();
        editor
            .apply_update("flow_1", json!({"title": "新しい題名"}), "ops")
            .await
            .unwrap();

        let stored = editor.store().load("flow_1").await.unwrap().unwrap();
        assert_eq!(stored.title, "新しい題名");
        assert_eq!(stored.update_history.len(), 1);
        assert_eq!(stored.update_history[0].updated_by, "ops");
    }

    #[tokio::test]
    async fn test_locks_are_per_id_and_prunable() {
        let locks = FlowLocks::new();
        let a = locks.acquire("flow_a").await;
        let _b = locks.acquire("flow_b").await;
        assert_eq!(locks.len().await, 2);

        drop(a);
        locks.prune().await;
        assert_eq!(locks.len().await, 1);
    }

    #[tokio::test]
    async fn test_release_keeps_contended_entries() {
        let locks = FlowLocks::new();
        let held = locks.acquire("flow_a").await;
        locks.release("flow_a").await;
        assert_eq!(locks.len().await, 1);

        drop(held);
        locks.release("flow_a").await;
        assert_eq!(locks.len().await, 0);
    }

    #[tokio::test]
    async fn test_editor_does_not_accumulate_locks() {
        let editor = FlowEditor::new(InMemoryFlowStore::new());
        for i in 0..5 {
            let id = format!("flow_{}", i);
            editor.create(&flow(&id)).await.unwrap();
            editor
                .apply_update(&id, json!({"title": "x"}), "ops")
                .await
                .unwrap();
            editor
                .update_step_title(&id, "step_1", "y", "ops")
                .await
                .unwrap();
        }
        let _ = editor.apply_update("flow_missing", json!({}), "ops").await;
        assert_eq!(editor.locks.len().await, 0);
    }
}
