//! Externally observable progress records.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::core::{GeneratorState, PipelineInstance, ProgressUpdate, TaskStatus};
use crate::errors::ProgressError;
use crate::utils::unix_now;

/// Durable progress record with optimistic concurrency.
///
/// `write` must reject an update whose `expected_version` does not match the
/// stored record (`Conflict`), an update that expects a record that no longer
/// exists (`NotFound`), and any non-reset update to a record in the `error`
/// state (`Locked`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// Reads the current record.
    async fn read(
        &self,
        instance: &PipelineInstance,
    ) -> Result<Option<GeneratorState>, ProgressError>;

    /// Applies an update and returns the new record.
    async fn write(
        &self,
        instance: &PipelineInstance,
        update: ProgressUpdate,
    ) -> Result<GeneratorState, ProgressError>;
}

/// In-memory progress reporter.
#[derive(Debug, Default)]
pub struct InMemoryProgressReporter {
    records: Mutex<HashMap<String, GeneratorState>>,
    writes: Mutex<usize>,
}

impl InMemoryProgressReporter {
    /// Creates a new in-memory reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many writes succeeded.
    #[must_use]
    pub fn write_count(&self) -> usize {
        *self.writes.lock()
    }

    /// Returns the stored record without going through the trait.
    #[must_use]
    pub fn get(&self, instance: &PipelineInstance) -> Option<GeneratorState> {
        self.records.lock().get(&instance.storage_key()).cloned()
    }

    /// Replaces the stored record, bypassing concurrency checks.
    pub fn put(&self, instance: &PipelineInstance, state: GeneratorState) {
        self.records.lock().insert(instance.storage_key(), state);
    }

    /// Deletes the stored record, as deleting the project would.
    pub fn remove(&self, instance: &PipelineInstance) {
        self.records.lock().remove(&instance.storage_key());
    }
}

#[async_trait]
impl ProgressReporter for InMemoryProgressReporter {
    async fn read(
        &self,
        instance: &PipelineInstance,
    ) -> Result<Option<GeneratorState>, ProgressError> {
        Ok(self.get(instance))
    }

    async fn write(
        &self,
        instance: &PipelineInstance,
        update: ProgressUpdate,
    ) -> Result<GeneratorState, ProgressError> {
        let key = instance.storage_key();
        let mut records = self.records.lock();

        let mut state = match (records.get(&key), update.expected_version) {
            (None, Some(_)) => return Err(ProgressError::NotFound { key }),
            (None, None) => GeneratorState::default(),
            (Some(current), _) if current.status == TaskStatus::Error && !update.reset => {
                return Err(ProgressError::Locked { key });
            }
            (Some(current), expected) if expected != Some(current.version) => {
                return Err(ProgressError::Conflict {
                    key,
                    expected,
                    actual: current.version,
                });
            }
            (Some(current), _) => current.clone(),
        };

        state.apply(&update, unix_now());
        records.insert(key, state.clone());
        *self.writes.lock() += 1;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ArtifactKind, Stage};

    fn instance() -> PipelineInstance {
        PipelineInstance::new("dev@example.com", "acme", "widgets", ArtifactKind::Specification)
    }

    #[tokio::test]
    async fn test_first_write_creates_record() {
        let reporter = InMemoryProgressReporter::new();
        assert!(reporter.read(&instance()).await.unwrap().is_none());

        let state = reporter
            .write(
                &instance(),
                ProgressUpdate::processing().with_stage(Stage::FileFiltering),
            )
            .await
            .unwrap();

        assert_eq!(state.version, 1);
        assert_eq!(state.stage, Some(Stage::FileFiltering));
        assert!(state.last_updated.is_some());
        assert_eq!(reporter.write_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let reporter = InMemoryProgressReporter::new();
        let first = reporter
            .write(&instance(), ProgressUpdate::processing())
            .await
            .unwrap();
        reporter
            .write(
                &instance(),
                ProgressUpdate::processing().expecting(Some(first.version)),
            )
            .await
            .unwrap();

        let err = reporter
            .write(
                &instance(),
                ProgressUpdate::processing().expecting(Some(first.version)),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProgressError::Conflict {
                expected: Some(1),
                actual: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_creating_over_existing_record_conflicts() {
        let reporter = InMemoryProgressReporter::new();
        reporter
            .write(&instance(), ProgressUpdate::processing())
            .await
            .unwrap();

        let err = reporter
            .write(&instance(), ProgressUpdate::processing())
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::Conflict { expected: None, .. }));
    }

    #[tokio::test]
    async fn test_vanished_record_is_not_found() {
        let reporter = InMemoryProgressReporter::new();
        let err = reporter
            .write(&instance(), ProgressUpdate::processing().expecting(Some(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_error_record_is_locked_until_reset() {
        let reporter = InMemoryProgressReporter::new();
        reporter.put(
            &instance(),
            GeneratorState {
                status: TaskStatus::Error,
                version: 7,
                ..Default::default()
            },
        );

        let err = reporter
            .write(&instance(), ProgressUpdate::processing().expecting(Some(7)))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::Locked { .. }));

        let state = reporter
            .write(
                &instance(),
                ProgressUpdate::processing()
                    .with_stage(Stage::FileFiltering)
                    .expecting(Some(7))
                    .as_reset(),
            )
            .await
            .unwrap();
        assert_eq!(state.status, TaskStatus::Processing);
        assert_eq!(state.version, 8);
    }
}
