//! The three pipeline variants and the file-gathering steps they share.

mod blueprint;
mod source;
mod specification;
mod template;

use std::sync::Arc;

pub use blueprint::{dominant_extension, BlueprintGenerator, DEFAULT_BLUEPRINT};
pub use source::{ScanSummary, SourceGenerator};
pub use specification::{SpecificationGenerator, SummarizationCheckpoint};
pub use template::EntryTemplate;

use crate::core::{ArtifactKind, Stage};
use crate::errors::{GeneratorError, Result};
use crate::source::{IgnoreFilter, SourceFile};
use crate::stages::{StageContext, StageHandler};
use crate::utils::with_timeout;

/// Returns the built-in handler for an artifact kind.
#[must_use]
pub fn handler_for(kind: ArtifactKind) -> Arc<dyn StageHandler> {
    match kind {
        ArtifactKind::Source => Arc::new(SourceGenerator),
        ArtifactKind::Specification => Arc::new(SpecificationGenerator),
        ArtifactKind::Blueprint => Arc::new(BlueprintGenerator),
    }
}

/// Returns every built-in handler.
#[must_use]
pub fn default_handlers() -> Vec<Arc<dyn StageHandler>> {
    [
        ArtifactKind::Source,
        ArtifactKind::Specification,
        ArtifactKind::Blueprint,
    ]
    .into_iter()
    .map(handler_for)
    .collect()
}

/// Source files surviving the ignore filter, with import statistics.
#[derive(Debug, Clone, Default)]
pub(crate) struct FilteredSource {
    pub files: Vec<SourceFile>,
    pub total_files: usize,
    pub imported_bytes: usize,
}

impl FilteredSource {
    pub fn retained_bytes(&self) -> usize {
        self.files.iter().map(|f| f.source.len()).sum()
    }
}

async fn ignore_filter(ctx: &StageContext<'_>) -> Result<IgnoreFilter> {
    let patterns = with_timeout(
        ctx.config.long_timeout(),
        "read ignore patterns",
        ctx.ports.source.ignore_patterns(ctx.instance),
    )
    .await?;
    IgnoreFilter::new(&patterns)
}

fn check_file_limit(ctx: &StageContext<'_>, count: usize, stage: Stage) -> Result<()> {
    if count >= ctx.config.max_files {
        return Err(GeneratorError::processing(
            format!(
                "Project has {count} files after filtering; the limit is {}",
                ctx.config.max_files
            ),
            stage,
        ));
    }
    Ok(())
}

/// Lists the project's file paths, minus ignored ones.
pub(crate) async fn filtered_paths(ctx: &StageContext<'_>, stage: Stage) -> Result<Vec<String>> {
    let filter = ignore_filter(ctx).await?;
    let paths = with_timeout(
        ctx.config.long_timeout(),
        "list project files",
        ctx.ports.source.list_files(ctx.instance),
    )
    .await?;
    let total = paths.len();
    let paths = filter.retain(paths, String::as_str);

    tracing::debug!(
        instance = %ctx.instance,
        retained = paths.len(),
        total,
        "Filtered file list"
    );
    check_file_limit(ctx, paths.len(), stage)?;
    Ok(paths)
}

/// Reads the project's files with contents, minus ignored ones.
pub(crate) async fn filtered_sources(
    ctx: &StageContext<'_>,
    stage: Stage,
) -> Result<FilteredSource> {
    let filter = ignore_filter(ctx).await?;
    let files = with_timeout(
        ctx.config.long_timeout(),
        "read project source",
        ctx.ports.source.read_files(ctx.instance),
    )
    .await?;
    let total_files = files.len();
    let imported_bytes = files.iter().map(|f| f.source.len()).sum();
    let files = filter.retain(files, |f| f.path.as_str());

    check_file_limit(ctx, files.len(), stage)?;
    Ok(FilteredSource {
        files,
        total_files,
        imported_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticSourceProvider, TestHarness};

    #[test]
    fn test_handler_registry() {
        for handler in default_handlers() {
            assert_eq!(handler_for(handler.kind()).kind(), handler.kind());
            assert_eq!(handler.stages()[0], Stage::StaticDefault);
        }
    }

    #[tokio::test]
    async fn test_filtered_paths_applies_ignore_patterns() {
        let harness = TestHarness::new(ArtifactKind::Source).with_source(
            StaticSourceProvider::new()
                .with_file("src/lib.rs", "x")
                .with_file("target/debug/app", "bin")
                .with_ignore_patterns(["target/"]),
        );

        let paths = filtered_paths(&harness.context(), Stage::FilePathScan)
            .await
            .unwrap();
        assert_eq!(paths, vec!["src/lib.rs"]);
    }

    #[tokio::test]
    async fn test_file_limit_is_inclusive() {
        let harness = TestHarness::new(ArtifactKind::Specification)
            .with_source(
                StaticSourceProvider::new()
                    .with_file("a.rs", "a")
                    .with_file("b.rs", "b")
                    .with_file("c.rs", "c"),
            )
            .with_config(crate::config::GeneratorConfig::default().with_max_files(3));

        let err = filtered_sources(&harness.context(), Stage::FileFiltering)
            .await
            .unwrap_err();
        assert_eq!(err.resume_stage(), Some(Stage::FileFiltering));
    }

    #[tokio::test]
    async fn test_filtered_sources_statistics() {
        let harness = TestHarness::new(ArtifactKind::Source).with_source(
            StaticSourceProvider::new()
                .with_file("src/lib.rs", "12345")
                .with_file("docs/guide.md", "123")
                .with_ignore_patterns(["*.md"]),
        );

        let filtered = filtered_sources(&harness.context(), Stage::FullSourceScan)
            .await
            .unwrap();
        assert_eq!(filtered.total_files, 2);
        assert_eq!(filtered.imported_bytes, 8);
        assert_eq!(filtered.retained_bytes(), 5);
    }
}
