//! Specification generation: one AI summary per project file.
//!
//! `FileFiltering` writes a placeholder entry per file and checkpoints the
//! work queue. Each `FileSummarization` activation then pops one file,
//! summarizes it and swaps its placeholder for the result, so a crash loses
//! at most one file of work.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{filtered_sources, EntryTemplate};
use crate::analysis::summarize_file;
use crate::core::{ArtifactKind, PipelineInstance, Stage};
use crate::errors::{GeneratorError, Result};
use crate::pipeline::FailureBudget;
use crate::source::SourceFile;
use crate::stages::{StageContext, StageHandler, StageOutcome};
use crate::utils::with_timeout;

const ENTRY: EntryTemplate = EntryTemplate::new("# Summary for").headed();

/// Body of an entry not summarized yet.
pub const PENDING_SUMMARY: &str = "No specification available";

/// Body of an entry whose summarization failed.
pub const FAILED_SUMMARY: &str = "Unable to generate specification";

const STAGES: &[Stage] = &[
    Stage::StaticDefault,
    Stage::FileFiltering,
    Stage::FileSummarization,
];

/// Work queue and failure counters persisted between activations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizationCheckpoint {
    /// Files still to summarize, in order.
    pub queue: Vec<SourceFile>,
    /// Failure counters.
    #[serde(default)]
    pub budget: FailureBudget,
}

/// Builds a per-file specification document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificationGenerator;

impl SpecificationGenerator {
    fn heading(instance: &PipelineInstance) -> String {
        ENTRY.heading(&instance.project, "")
    }

    async fn filter(ctx: &StageContext<'_>) -> Result<StageOutcome> {
        let filtered = filtered_sources(ctx, Stage::FileFiltering).await?;
        let files = filtered.files;

        let mut document = Self::heading(ctx.instance);
        for file in &files {
            document.push_str(&ENTRY.render(&file.path, PENDING_SUMMARY));
        }

        let count = files.len();
        let checkpoint = SummarizationCheckpoint {
            budget: FailureBudget::new(count),
            queue: files,
        };
        ctx.save_checkpoint(Stage::FileSummarization, &checkpoint)
            .await?;

        info!(
            instance = %ctx.instance,
            queued = count,
            total = filtered.total_files,
            "Queued files for summarization"
        );
        Ok(StageOutcome::advance(document, Stage::FileSummarization).with_child_resources(count))
    }

    async fn summarize_next(ctx: &StageContext<'_>, output: String) -> Result<StageOutcome> {
        let mut checkpoint: SummarizationCheckpoint = ctx
            .require_checkpoint(Stage::FileSummarization, Stage::FileFiltering)
            .await?;

        if checkpoint.queue.is_empty() {
            debug!(instance = %ctx.instance, "Summarization queue is empty");
            return Ok(StageOutcome::advance(output, Stage::Complete).with_child_resources(0));
        }

        let file = checkpoint.queue.remove(0);
        let next = if checkpoint.queue.is_empty() || ctx.config.single_shot {
            Stage::Complete
        } else {
            Stage::FileSummarization
        };

        if !file.is_complete() {
            warn!(instance = %ctx.instance, path = %file.path, "Skipping file without path or contents");
            ctx.save_checkpoint(Stage::FileSummarization, &checkpoint)
                .await?;
            return Ok(StageOutcome::advance(output, next)
                .with_child_resources(checkpoint.queue.len()));
        }

        let mut document = ctx.load_artifact().await?;
        if document.is_empty() {
            warn!(instance = %ctx.instance, "Specification artifact missing; rebuilding from heading");
            document = Self::heading(ctx.instance);
        }

        let summary = with_timeout(
            ctx.config.long_timeout(),
            "summarize file",
            summarize_file(ctx.ports.analysis.as_ref(), &file),
        )
        .await;
        let (body, abort) = match summary {
            Ok(summary) => {
                checkpoint.budget.record_success();
                (summary, None)
            }
            Err(e) => {
                warn!(instance = %ctx.instance, path = %file.path, error = %e, "Summarization failed");
                checkpoint.budget.record_failure(file.path.clone());
                let abort = checkpoint.budget.check(&ctx.config.failure_policy);
                (FAILED_SUMMARY.to_string(), abort)
            }
        };
        let document = ENTRY.upsert(&document, &file.path, &body);

        ctx.save_checkpoint(Stage::FileSummarization, &checkpoint)
            .await?;

        if let Some(reason) = abort {
            warn!(
                instance = %ctx.instance,
                errors = checkpoint.budget.errors,
                processed = checkpoint.budget.processed,
                success_rate = checkpoint.budget.success_rate(),
                "{reason}"
            );
            ctx.save_artifact(&document).await?;
            return Err(GeneratorError::processing(
                reason.to_string(),
                Stage::FileSummarization,
            ));
        }

        if next == Stage::Complete && checkpoint.budget.has_failures() {
            warn!(
                instance = %ctx.instance,
                failed = ?checkpoint.budget.failed_files,
                success_rate = checkpoint.budget.success_rate(),
                "Summarization finished with failures"
            );
        }

        Ok(StageOutcome::advance(document, next).with_child_resources(checkpoint.queue.len()))
    }
}

#[async_trait]
impl StageHandler for SpecificationGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Specification
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    async fn handle(
        &self,
        ctx: &StageContext<'_>,
        stage: Stage,
        output: String,
    ) -> Result<StageOutcome> {
        match stage {
            Stage::StaticDefault => {
                let next = if ctx.config.skip_ai_analysis {
                    Stage::Complete
                } else {
                    Stage::FileFiltering
                };
                Ok(StageOutcome::advance(Self::heading(ctx.instance), next))
            }
            Stage::FileFiltering => Self::filter(ctx).await,
            Stage::FileSummarization => Self::summarize_next(ctx, output).await,
            other => Err(GeneratorError::Defect(format!(
                "specification generator cannot handle stage {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::testing::{StaticSourceProvider, TestHarness};
    use pretty_assertions::assert_eq;

    fn harness(files: usize) -> TestHarness {
        let mut provider = StaticSourceProvider::new();
        for i in 0..files {
            provider = provider.with_file(format!("src/f{i}.rs"), format!("fn f{i}() {{}}"));
        }
        TestHarness::new(ArtifactKind::Specification).with_source(provider)
    }

    async fn run(harness: &TestHarness, stage: Stage) -> Result<StageOutcome> {
        let ctx = harness.context();
        let outcome = SpecificationGenerator
            .handle(&ctx, stage, String::new())
            .await?;
        if !outcome.output.is_empty() {
            ctx.save_artifact(&outcome.output).await?;
        }
        Ok(outcome)
    }

    #[tokio::test]
    async fn test_static_default_respects_skip_flag() {
        let harness = harness(0);
        let outcome = run(&harness, Stage::StaticDefault).await.unwrap();
        assert_eq!(outcome.output, "# Summary for widgets:\n\n\n");
        assert_eq!(outcome.next, Some(Stage::FileFiltering));

        let harness = harness.with_config(GeneratorConfig::default().with_skip_ai_analysis(true));
        let outcome = run(&harness, Stage::StaticDefault).await.unwrap();
        assert_eq!(outcome.next, Some(Stage::Complete));
    }

    #[tokio::test]
    async fn test_filtering_writes_placeholders_and_queue() {
        let harness = harness(2);
        let outcome = run(&harness, Stage::FileFiltering).await.unwrap();

        assert_eq!(
            outcome.output,
            "# Summary for widgets:\n\n\n\
             # Summary for src/f0.rs:\nNo specification available\n\n\
             # Summary for src/f1.rs:\nNo specification available\n\n"
        );
        let checkpoint: SummarizationCheckpoint = harness
            .context()
            .load_checkpoint(Stage::FileSummarization)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.queue.len(), 2);
        assert_eq!(checkpoint.budget.total_files, 2);
    }

    #[tokio::test]
    async fn test_summarization_replaces_one_entry_per_activation() {
        let harness = harness(3);
        run(&harness, Stage::FileFiltering).await.unwrap();

        let outcome = run(&harness, Stage::FileSummarization).await.unwrap();
        assert_eq!(outcome.next, Some(Stage::FileSummarization));
        assert_eq!(outcome.hints.child_resources, Some(2));
        assert!(outcome
            .output
            .contains("# Summary for src/f0.rs:\nSummary of src/f0.rs\n\n"));
        assert!(outcome
            .output
            .contains("# Summary for src/f1.rs:\nNo specification available\n\n"));

        run(&harness, Stage::FileSummarization).await.unwrap();
        let last = run(&harness, Stage::FileSummarization).await.unwrap();
        assert_eq!(last.next, Some(Stage::Complete));
        assert!(!last.output.contains(PENDING_SUMMARY));
        assert_eq!(
            harness.analysis.summarized_paths(),
            vec!["src/f0.rs", "src/f1.rs", "src/f2.rs"]
        );
    }

    #[tokio::test]
    async fn test_failed_summary_is_recorded_in_place() {
        let harness = harness(12);
        harness.analysis.fail_path("src/f0.rs");
        run(&harness, Stage::FileFiltering).await.unwrap();

        let outcome = run(&harness, Stage::FileSummarization).await.unwrap();
        assert!(outcome
            .output
            .contains("# Summary for src/f0.rs:\nUnable to generate specification\n\n"));

        let checkpoint: SummarizationCheckpoint = harness
            .context()
            .load_checkpoint(Stage::FileSummarization)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.budget.errors, 1);
        assert_eq!(checkpoint.budget.failed_files, vec!["src/f0.rs"]);
    }

    #[tokio::test]
    async fn test_abort_persists_state_before_raising() {
        let harness = harness(5);
        for i in 0..3 {
            harness.analysis.fail_path(format!("src/f{i}.rs"));
        }
        run(&harness, Stage::FileFiltering).await.unwrap();
        run(&harness, Stage::FileSummarization).await.unwrap();
        run(&harness, Stage::FileSummarization).await.unwrap();

        let err = run(&harness, Stage::FileSummarization).await.unwrap_err();
        assert_eq!(err.resume_stage(), Some(Stage::FileSummarization));

        let checkpoint: SummarizationCheckpoint = harness
            .context()
            .load_checkpoint(Stage::FileSummarization)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(checkpoint.queue.len(), 2);
        assert_eq!(checkpoint.budget.errors, 3);

        let artifact = harness.artifact().unwrap();
        assert!(artifact.contains("# Summary for src/f2.rs:\nUnable to generate specification\n\n"));

        let resumed = run(&harness, Stage::FileSummarization).await.unwrap();
        assert_eq!(resumed.next, Some(Stage::FileSummarization));
        assert!(resumed.output.contains("# Summary for src/f3.rs:\nSummary of src/f3.rs\n\n"));
    }

    #[tokio::test]
    async fn test_incomplete_file_is_skipped() {
        let harness = TestHarness::new(ArtifactKind::Specification).with_source(
            StaticSourceProvider::new()
                .with_file("src/empty.rs", "")
                .with_file("src/full.rs", "fn x() {}"),
        );
        run(&harness, Stage::FileFiltering).await.unwrap();

        let outcome = run(&harness, Stage::FileSummarization).await.unwrap();
        assert_eq!(outcome.output, "");
        assert_eq!(outcome.next, Some(Stage::FileSummarization));
        assert!(harness.analysis.calls().is_empty());
    }

    #[tokio::test]
    async fn test_single_shot_completes_after_one_file() {
        let harness =
            harness(3).with_config(GeneratorConfig::default().with_single_shot(true));
        run(&harness, Stage::FileFiltering).await.unwrap();
        let outcome = run(&harness, Stage::FileSummarization).await.unwrap();
        assert_eq!(outcome.next, Some(Stage::Complete));
    }

    #[tokio::test]
    async fn test_missing_queue_resumes_at_filtering() {
        let harness = harness(1);
        let err = run(&harness, Stage::FileSummarization).await.unwrap_err();
        assert_eq!(err.resume_stage(), Some(Stage::FileFiltering));
    }

    #[tokio::test]
    async fn test_empty_queue_completes() {
        let harness = harness(0);
        run(&harness, Stage::FileFiltering).await.unwrap();
        let outcome = run(&harness, Stage::FileSummarization).await.unwrap();
        assert_eq!(outcome.next, Some(Stage::Complete));
    }
}
