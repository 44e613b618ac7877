//! Final output text of each pipeline.

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::core::PipelineInstance;
use crate::errors::Result;

/// Whole-text persistence for pipeline artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Saves (overwrites) the artifact.
    async fn save(&self, instance: &PipelineInstance, content: &str) -> Result<()>;

    /// Loads the artifact; a never-generated artifact is `None`.
    async fn load(&self, instance: &PipelineInstance) -> Result<Option<String>>;
}

/// Returns the sha256 hex digest recorded alongside a saved artifact.
#[must_use]
pub fn artifact_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory artifact store.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Mutex<HashMap<String, String>>,
    saves: Mutex<usize>,
}

impl InMemoryArtifactStore {
    /// Creates a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many saves were performed.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    /// Returns the stored artifact without going through the trait.
    #[must_use]
    pub fn get(&self, instance: &PipelineInstance) -> Option<String> {
        self.artifacts.lock().get(&instance.storage_key()).cloned()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn save(&self, instance: &PipelineInstance, content: &str) -> Result<()> {
        self.artifacts
            .lock()
            .insert(instance.storage_key(), content.to_string());
        *self.saves.lock() += 1;
        Ok(())
    }

    async fn load(&self, instance: &PipelineInstance) -> Result<Option<String>> {
        Ok(self.get(instance))
    }
}
