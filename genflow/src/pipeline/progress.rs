//! End-of-stage progress reporting.

use tracing::{info, warn};

use crate::core::{GeneratorState, PipelineInstance, ProgressUpdate, Stage, TaskStatus};
use crate::errors::{ProgressError, Result};
use crate::stages::ProgressHints;
use crate::stores::ProgressReporter;

/// How an activation treats progress writes that lose a consistency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProgressMode {
    /// `NotFound`, `Locked` and `Conflict` fail the activation.
    #[default]
    Strict,
    /// Those outcomes are logged and the stage result is kept.
    Forced,
}

/// Everything the engine reports after a stage finished.
#[derive(Debug, Clone)]
pub(crate) struct StageReport {
    pub stage: Stage,
    pub next: Stage,
    pub expected_version: Option<u64>,
    pub reset: bool,
    pub stages_remaining: usize,
    pub hints: ProgressHints,
    pub artifact_digest: Option<String>,
}

impl StageReport {
    fn update(&self) -> ProgressUpdate {
        let details = if self.next == Stage::Complete {
            format!("Finished stage {}, generation complete", self.stage)
        } else {
            format!("Finished stage {}, moving to {}", self.stage, self.next)
        };
        let remaining = if self.next == Stage::Complete {
            0
        } else {
            self.stages_remaining
        };

        let mut update = ProgressUpdate::processing()
            .with_stage(self.next)
            .with_details(details)
            .with_stages_remaining(remaining)
            .expecting(self.expected_version);
        update.child_resources = self.hints.child_resources;
        update.resources_state.clone_from(&self.hints.resources_state);
        update.artifact_digest.clone_from(&self.artifact_digest);
        update.reset = self.reset;
        update.stage_finished = true;
        update
    }
}

/// Applies the mode to the outcome of one write.
fn settle(
    instance: &PipelineInstance,
    result: Result<GeneratorState, ProgressError>,
    mode: ProgressMode,
) -> Result<Option<GeneratorState>> {
    match result {
        Ok(state) => Ok(Some(state)),
        Err(e) if mode == ProgressMode::Forced && e.is_consistency_failure() => {
            warn!(instance = %instance, error = %e, "Ignoring progress failure in forced mode");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Writes the end-of-stage record; on completion, follows up with the idle
/// record. Returns the last record written, if any write went through.
pub(crate) async fn report_stage(
    progress: &dyn ProgressReporter,
    instance: &PipelineInstance,
    report: &StageReport,
    mode: ProgressMode,
) -> Result<Option<GeneratorState>> {
    let written = settle(
        instance,
        progress.write(instance, report.update()).await,
        mode,
    )?;

    if report.next != Stage::Complete {
        return Ok(written);
    }
    let Some(state) = written else {
        return Ok(None);
    };

    let finalize = ProgressUpdate::new(TaskStatus::Idle)
        .with_stage(Stage::Complete)
        .with_details("Generation complete")
        .with_stages_remaining(0)
        .expecting(Some(state.version));
    let finished = settle(instance, progress.write(instance, finalize).await, mode)?;
    if finished.is_some() {
        info!(instance = %instance, "Generation complete");
    }
    Ok(finished)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ArtifactKind;
    use crate::stores::{InMemoryProgressReporter, MockProgressReporter};
    use pretty_assertions::assert_eq;

    fn instance() -> PipelineInstance {
        PipelineInstance::new("dev@example.com", "acme", "widgets", ArtifactKind::Source)
    }

    fn report(stage: Stage, next: Stage) -> StageReport {
        StageReport {
            stage,
            next,
            expected_version: None,
            reset: false,
            stages_remaining: 2,
            hints: ProgressHints::default(),
            artifact_digest: None,
        }
    }

    #[tokio::test]
    async fn test_intermediate_report() {
        let reporter = InMemoryProgressReporter::new();
        let state = report_stage(
            &reporter,
            &instance(),
            &report(Stage::SourceSyncPoints, Stage::FilePathScan),
            ProgressMode::Strict,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(state.stage, Some(Stage::FilePathScan));
        assert_eq!(state.status, TaskStatus::Processing);
        assert_eq!(
            state.status_details.as_deref(),
            Some("Finished stage SourceSyncPoints, moving to FilePathScan")
        );
        assert_eq!(state.possible_stages_remaining, Some(2));
        assert_eq!(state.processed_stages, 1);
    }

    #[tokio::test]
    async fn test_completion_writes_idle_record() {
        let reporter = InMemoryProgressReporter::new();
        let state = report_stage(
            &reporter,
            &instance(),
            &report(Stage::FullSourceScan, Stage::Complete),
            ProgressMode::Strict,
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(state.status, TaskStatus::Idle);
        assert_eq!(state.stage, Some(Stage::Complete));
        assert_eq!(state.possible_stages_remaining, Some(0));
        assert_eq!(reporter.write_count(), 2);
    }

    #[tokio::test]
    async fn test_forced_mode_swallows_consistency_failures() {
        for failure in [
            ProgressError::NotFound { key: "k".into() },
            ProgressError::Locked { key: "k".into() },
            ProgressError::Conflict {
                key: "k".into(),
                expected: Some(1),
                actual: 2,
            },
        ] {
            let mut mock = MockProgressReporter::new();
            let returned = failure.clone();
            mock.expect_write()
                .times(1)
                .returning(move |_, _| Err(returned.clone()));

            let result = report_stage(
                &mock,
                &instance(),
                &report(Stage::FileFiltering, Stage::FileSummarization),
                ProgressMode::Forced,
            )
            .await;
            assert_eq!(result.unwrap(), None, "{failure}");

            let mut mock = MockProgressReporter::new();
            let returned = failure.clone();
            mock.expect_write()
                .times(1)
                .returning(move |_, _| Err(returned.clone()));

            let err = report_stage(
                &mock,
                &instance(),
                &report(Stage::FileFiltering, Stage::FileSummarization),
                ProgressMode::Strict,
            )
            .await
            .unwrap_err();
            assert!(!err.is_recoverable());
        }
    }

    #[tokio::test]
    async fn test_other_failures_are_fatal_even_when_forced() {
        let mut mock = MockProgressReporter::new();
        mock.expect_write()
            .returning(|_, _| Err(ProgressError::Other("disk full".into())));

        let err = report_stage(
            &mock,
            &instance(),
            &report(Stage::FileFiltering, Stage::FileSummarization),
            ProgressMode::Forced,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_forced_completion_skips_finalize_after_lost_write() {
        let mut mock = MockProgressReporter::new();
        mock.expect_write()
            .times(1)
            .returning(|_, _| Err(ProgressError::NotFound { key: "k".into() }));

        let result = report_stage(
            &mock,
            &instance(),
            &report(Stage::FullSourceScan, Stage::Complete),
            ProgressMode::Forced,
        )
        .await
        .unwrap();
        assert_eq!(result, None);
    }
}
