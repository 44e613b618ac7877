//! Source aggregation: one markdown document with every retained file.

use async_trait::async_trait;
use futures::future::join_all;
use std::fmt;
use tracing::{info, warn};

use super::{filtered_paths, filtered_sources, EntryTemplate};
use crate::core::{ArtifactKind, PipelineInstance, ResourceSyncState, Stage};
use crate::errors::{GeneratorError, Result};
use crate::stages::{StageContext, StageHandler, StageOutcome};
use crate::utils::{run_with_timeout, TimedResult};

const ENTRY: EntryTemplate = EntryTemplate::new("# Contents of").headed();

const STAGES: &[Stage] = &[
    Stage::StaticDefault,
    Stage::SourceSyncPoints,
    Stage::FilePathScan,
    Stage::FullSourceScan,
];

/// Import statistics of a full source scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    /// Files returned by the provider.
    pub total_files: usize,
    /// Files kept after filtering.
    pub retained_files: usize,
    /// Bytes returned by the provider.
    pub imported_bytes: usize,
    /// Bytes kept after filtering.
    pub retained_bytes: usize,
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} files retained ({} of {} bytes)",
            self.retained_files, self.total_files, self.retained_bytes, self.imported_bytes
        )
    }
}

/// Aggregates the project's source into one document.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceGenerator;

impl SourceGenerator {
    fn heading(instance: &PipelineInstance) -> String {
        ENTRY.heading(&instance.project, &instance.resource_uris())
    }

    /// Looks up every resource concurrently; a failed or slow lookup
    /// degrades to no sync point.
    async fn sync_points(ctx: &StageContext<'_>) -> Vec<ResourceSyncState> {
        let lookups = ctx.instance.resources.iter().map(|resource| async move {
            let lookup = ctx.ports.source.sync_point(ctx.instance, resource);
            let sync_point = match run_with_timeout(ctx.config.short_timeout(), lookup).await {
                TimedResult::Ok(point) => point,
                TimedResult::Err(e) => {
                    warn!(
                        instance = %ctx.instance,
                        uri = %resource.uri,
                        error = %e,
                        "Sync point lookup failed"
                    );
                    None
                }
                TimedResult::Timeout => {
                    warn!(
                        instance = %ctx.instance,
                        uri = %resource.uri,
                        "Sync point lookup timed out"
                    );
                    None
                }
            };
            ResourceSyncState {
                uri: resource.uri.clone(),
                sync_point,
            }
        });
        join_all(lookups).await
    }
}

#[async_trait]
impl StageHandler for SourceGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Source
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
            Stage::StaticDefault => Ok(StageOutcome::advance(
                Self::heading(ctx.instance),
                Stage::SourceSyncPoints,
            )),
            Stage::SourceSyncPoints => {
                let states = Self::sync_points(ctx).await;
                Ok(StageOutcome::advance(output, Stage::FilePathScan).with_resources_state(states))
            }
            Stage::FilePathScan => {
                let paths = filtered_paths(ctx, stage).await?;
                let mut document = ctx.load_artifact().await?;
                if document.is_empty() {
                    document = Self::heading(ctx.instance);
                }
                for path in &paths {
                    document = ENTRY.upsert(&document, path, "");
                }
                Ok(StageOutcome::advance(document, Stage::FullSourceScan)
                    .with_child_resources(paths.len()))
            }
            Stage::FullSourceScan => {
                let filtered = filtered_sources(ctx, stage).await?;
                let summary = ScanSummary {
                    total_files: filtered.total_files,
                    retained_files: filtered.files.len(),
                    imported_bytes: filtered.imported_bytes,
                    retained_bytes: filtered.retained_bytes(),
                };
                info!(
                    instance = %ctx.instance,
                    imported_bytes = summary.imported_bytes,
                    retained_bytes = summary.retained_bytes,
                    "Imported {summary}"
                );

                let mut document = Self::heading(ctx.instance);
                for file in &filtered.files {
                    document.push_str(&ENTRY.render(&file.path, &file.source));
                }
                Ok(StageOutcome::advance(document, Stage::Complete)
                    .with_child_resources(summary.retained_files))
            }
            other => Err(GeneratorError::Defect(format!(
                "source generator cannot handle stage {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProjectResource, SyncPoint};
    use crate::testing::{StaticSourceProvider, TestHarness};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn harness(provider: StaticSourceProvider) -> TestHarness {
        TestHarness::new(ArtifactKind::Source).with_source(provider)
    }

    #[tokio::test]
    async fn test_static_default_writes_heading() {
        let harness = harness(StaticSourceProvider::new());
        let outcome = SourceGenerator
            .handle(&harness.context(), Stage::StaticDefault, String::new())
            .await
            .unwrap();

        assert_eq!(
            outcome.output,
            "# Contents of widgets:\nhttps://github.com/acme/widgets\n\n"
        );
        assert_eq!(outcome.next, Some(Stage::SourceSyncPoints));
    }

    #[tokio::test]
    async fn test_file_named_like_project_keeps_heading() {
        let harness = harness(
            StaticSourceProvider::new()
                .with_file("widgets", "#!/bin/sh")
                .with_file("src/lib.rs", "pub fn a() {}"),
        );
        let ctx = harness.context();
        let heading = SourceGenerator
            .handle(&ctx, Stage::StaticDefault, String::new())
            .await
            .unwrap();
        ctx.save_artifact(&heading.output).await.unwrap();

        let scan = SourceGenerator
            .handle(&ctx, Stage::FilePathScan, String::new())
            .await
            .unwrap();

        assert_eq!(
            scan.output,
            "# Contents of widgets:\nhttps://github.com/acme/widgets\n\n\
             # Contents of widgets:\n\n\n\
             # Contents of src/lib.rs:\n\n\n"
        );
    }

    #[tokio::test]
    async fn test_sync_points_degrade_per_resource() {
        let point = SyncPoint {
            commit_time: 1_700_000_000,
            commit_hash: "abc123".to_string(),
        };
        let harness = harness(
            StaticSourceProvider::new()
                .with_sync_point("https://github.com/acme/widgets", point.clone())
                .with_failing_sync("https://github.com/acme/private"),
        )
        .with_instance(|instance| {
            instance
                .with_resource(ProjectResource::new("https://github.com/acme/private"))
                .with_resource(ProjectResource::new("https://github.com/acme/unknown"))
        });

        let outcome = SourceGenerator
            .handle(&harness.context(), Stage::SourceSyncPoints, String::new())
            .await
            .unwrap();

        assert_eq!(outcome.output, "");
        assert_eq!(outcome.next, Some(Stage::FilePathScan));
        let states = outcome.hints.resources_state.unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0].sync_point, Some(point));
        assert_eq!(states[1].sync_point, None);
        assert_eq!(states[2].sync_point, None);
    }

    #[tokio::test]
    async fn test_slow_sync_point_uses_short_timeout() {
        let harness = harness(StaticSourceProvider::new().with_sync_delay(Duration::from_secs(30)))
            .with_config(crate::config::GeneratorConfig::default().with_short_timeout(0.05));

        let outcome = SourceGenerator
            .handle(&harness.context(), Stage::SourceSyncPoints, String::new())
            .await
            .unwrap();

        let states = outcome.hints.resources_state.unwrap();
        assert_eq!(states[0].sync_point, None);
    }

    #[tokio::test]
    async fn test_file_path_scan_writes_empty_entries() {
        let harness = harness(
            StaticSourceProvider::new()
                .with_file("src/main.rs", "fn main() {}")
                .with_file("notes.log", "debug")
                .with_ignore_patterns(["*.log"]),
        );

        let outcome = SourceGenerator
            .handle(&harness.context(), Stage::FilePathScan, String::new())
            .await
            .unwrap();

        assert_eq!(
            outcome.output,
            "# Contents of widgets:\nhttps://github.com/acme/widgets\n\n# Contents of src/main.rs:\n\n\n"
        );
        assert_eq!(outcome.hints.child_resources, Some(1));
    }

    #[tokio::test]
    async fn test_file_path_scan_is_idempotent() {
        let harness = harness(StaticSourceProvider::new().with_file("a.rs", "a"));
        let ctx = harness.context();

        let first = SourceGenerator
            .handle(&ctx, Stage::FilePathScan, String::new())
            .await
            .unwrap();
        ctx.save_artifact(&first.output).await.unwrap();
        let second = SourceGenerator
            .handle(&ctx, Stage::FilePathScan, String::new())
            .await
            .unwrap();

        assert_eq!(first.output, second.output);
    }

    #[tokio::test]
    async fn test_full_source_scan_keeps_retained_files() {
        let mut provider = StaticSourceProvider::new().with_ignore_patterns(["docs/", "*.lock"]);
        for i in 0..7 {
            provider = provider.with_file(format!("src/mod{i}.rs"), format!("// module {i}"));
        }
        provider = provider
            .with_file("docs/a.md", "a")
            .with_file("docs/b.md", "b")
            .with_file("Cargo.lock", "lock");
        let harness = harness(provider);

        let outcome = SourceGenerator
            .handle(&harness.context(), Stage::FullSourceScan, String::new())
            .await
            .unwrap();

        assert_eq!(outcome.next, Some(Stage::Complete));
        assert_eq!(outcome.hints.child_resources, Some(7));
        assert!(outcome.output.contains("# Contents of src/mod3.rs:\n// module 3\n\n"));
        assert!(!outcome.output.contains("docs/a.md"));
        assert!(!outcome.output.contains("Cargo.lock"));
    }

    #[test]
    fn test_scan_summary_display() {
        let summary = ScanSummary {
            total_files: 10,
            retained_files: 7,
            imported_bytes: 100,
            retained_bytes: 70,
        };
        assert_eq!(summary.to_string(), "7/10 files retained (70 of 100 bytes)");
    }

    #[tokio::test]
    async fn test_unavailable_source_is_fatal() {
        let harness = harness(StaticSourceProvider::new().unavailable());
        let err = SourceGenerator
            .handle(&harness.context(), Stage::FullSourceScan, String::new())
            .await
            .unwrap_err();
        assert!(!err.is_recoverable());
    }
}
