//! Conversation memory across turns, keyed by an opaque checkpoint id.
//!
//! The orchestration core only ever sees the id; what sits behind it is a
//! persistence collaborator. The in-memory implementation below is the
//! default for a single-process deployment and for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::TurnMessage;

/// Generates a fresh opaque checkpoint identifier.
pub fn new_checkpoint_id() -> String {
    Uuid::new_v4().to_string()
}

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Message history recorded under `checkpoint_id`, empty when unknown.
    async fn load(&self, checkpoint_id: &str) -> Vec<TurnMessage>;

    /// Replaces the history recorded under `checkpoint_id`.
    async fn save(&self, checkpoint_id: &str, messages: Vec<TurnMessage>);
}

pub struct MemoryCheckpointStore {
    entries: Mutex<HashMap<String, Vec<TurnMessage>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
        })
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, checkpoint_id: &str) -> Vec<TurnMessage> {
        self.entries
            .lock()
            .await
            .get(checkpoint_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn save(&self, checkpoint_id: &str, messages: Vec<TurnMessage>) {
        self.entries
            .lock()
            .await
            .insert(checkpoint_id.to_string(), messages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_checkpoint_loads_empty_history() {
        let store = MemoryCheckpointStore::new();
        assert!(store.load("missing").await.is_empty());
    }

    #[tokio::test]
    async fn saved_history_is_returned_on_load() {
        let store = MemoryCheckpointStore::new();
        let id = new_checkpoint_id();
        store
            .save(&id, vec![TurnMessage::user("hello")])
            .await;
        let history = store.load(&id).await;
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn checkpoint_ids_are_unique() {
        assert_ne!(new_checkpoint_id(), new_checkpoint_id());
    }
}
