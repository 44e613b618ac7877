//! Scratch data saved between activations.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::core::{PipelineInstance, Stage};
use crate::errors::Result;

/// Key/value persistence for scratch data, keyed by (instance, stage).
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Saves (overwrites) the scratch entry of a stage.
    async fn save(
        &self,
        instance: &PipelineInstance,
        stage: Stage,
        value: serde_json::Value,
    ) -> Result<()>;

    /// Loads the scratch entry of a stage, if one was ever saved.
    async fn load(
        &self,
        instance: &PipelineInstance,
        stage: Stage,
    ) -> Result<Option<serde_json::Value>>;
}

/// In-memory checkpoint store.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    entries: DashMap<String, serde_json::Value>,
}

impl InMemoryCheckpointStore {
    /// Creates a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes one entry, as a lost write would.
    pub fn remove(&self, instance: &PipelineInstance, stage: Stage) {
        self.entries.remove(&instance.checkpoint_key(stage));
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(
        &self,
        instance: &PipelineInstance,
        stage: Stage,
        value: serde_json::Value,
    ) -> Result<()> {
        self.entries.insert(instance.checkpoint_key(stage), value);
        Ok(())
    }

    async fn load(
        &self,
        instance: &PipelineInstance,
        stage: Stage,
    ) -> Result<Option<serde_json::Value>> {
        Ok(self
            .entries
            .get(&instance.checkpoint_key(stage))
            .map(|entry| entry.value().clone()))
    }
}
