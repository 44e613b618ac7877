//! Blueprint generation.
//!
//! The shallow path derives a heuristic blueprint from the dominant source
//! extension. With deep analysis enabled the pipeline continues: the
//! analysis service drafts a blueprint from the file list, sample files are
//! gathered, and the draft is refined into the final text.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{info, warn};

use super::filtered_paths;
use crate::analysis::{draft_blueprint, refine_blueprint, DraftBlueprint, RefinementRequest};
use crate::core::{ArtifactKind, Stage};
use crate::errors::{GeneratorError, Result};
use crate::stages::{StageContext, StageHandler, StageOutcome};
use crate::utils::with_timeout;

/// Placeholder blueprint; `{projectName}` and `{languages}` are filled in.
pub const DEFAULT_BLUEPRINT: &str = "## Architectural Blueprint Summary for: {projectName}
* Software Project Type: Unknown
* High-Level Summary: A software project
* Programming Languages: {languages}
* Test / Quality Strategy: Not yet determined
* Software Principles: Not yet determined
* Data Storage: Not yet determined
* Software Licensing: Not yet determined
* Security Handling: Not yet determined
* Performance characteristics: Not yet determined
* Software resiliency patterns: Not yet determined
* Analysis of the architectural soundness and best practices: Not yet determined
* Architectural Problems Identified: Not yet determined";

const UNDETERMINED: &str = "Not yet determined";
const NO_CODE: &str = "No Code Provided";
const NO_PROJECT_FILE: &str = "No Project File Provided";

/// Extensions that never decide the project language.
const NON_SOURCE_EXTENSIONS: &[&str] = &[
    "md", "txt", "json", "yml", "yaml", "lock", "csv", "xml", "toml", "ini", "cfg", "log",
];

const STAGES: &[Stage] = &[
    Stage::StaticDefault,
    Stage::FileImport,
    Stage::SourceLanguageScan,
    Stage::FileScan,
    Stage::SampledCode,
    Stage::BuildingBlueprint,
];

/// Returns the most common source extension among `paths`, lowercased and
/// without the dot. Ties go to the alphabetically first extension.
#[must_use]
pub fn dominant_extension<S: AsRef<str>>(paths: &[S]) -> Option<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for path in paths {
        let name = path.as_ref().rsplit('/').next().unwrap_or_default();
        let Some((stem, ext)) = name.rsplit_once('.') else {
            continue;
        };
        if stem.is_empty() || ext.is_empty() {
            continue;
        }
        let ext = ext.to_ascii_lowercase();
        if NON_SOURCE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }
        *counts.entry(ext).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_ext, a), (b_ext, b)| a.cmp(b).then_with(|| b_ext.cmp(a_ext)))
        .map(|(ext, _)| ext)
}

fn language_name(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "rs" => "Rust",
        "ts" | "tsx" => "TypeScript",
        "js" | "jsx" | "mjs" => "JavaScript",
        "py" => "Python",
        "go" => "Go",
        "java" => "Java",
        "kt" => "Kotlin",
        "cs" => "C#",
        "cpp" | "cc" | "hpp" => "C++",
        "c" | "h" => "C",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        _ => return None,
    })
}

fn render_blueprint(project: &str, languages: &str) -> String {
    DEFAULT_BLUEPRINT
        .replace("{projectName}", project)
        .replace("{languages}", languages)
}

/// Produces the architectural blueprint.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlueprintGenerator;

impl BlueprintGenerator {
    async fn file_list(ctx: &StageContext<'_>) -> Result<Vec<String>> {
        ctx.require_checkpoint(Stage::FileImport, Stage::FileImport)
            .await
    }

    async fn language_scan(ctx: &StageContext<'_>) -> Result<StageOutcome> {
        let files = Self::file_list(ctx).await?;
        let languages = match dominant_extension(files.as_slice()) {
            Some(ext) => match language_name(&ext) {
                Some(name) => format!("{name} (.{ext})"),
                None => format!("Predominantly .{ext} files"),
            },
            None => UNDETERMINED.to_string(),
        };
        info!(instance = %ctx.instance, %languages, "Detected project languages");

        let next = if ctx.config.deep_analysis {
            Stage::FileScan
        } else {
            Stage::Complete
        };
        Ok(StageOutcome::advance(
            render_blueprint(&ctx.instance.project, &languages),
            next,
        ))
    }

    async fn draft(ctx: &StageContext<'_>) -> Result<StageOutcome> {
        let files = Self::file_list(ctx).await?;
        let draft = with_timeout(
            ctx.config.long_timeout(),
            "draft blueprint",
            draft_blueprint(ctx.ports.analysis.as_ref(), &files),
        )
        .await?;
        info!(
            instance = %ctx.instance,
            prioritized = draft.prioritized_files.len(),
            excluded = draft.excluded_files.len(),
            "Received draft blueprint"
        );
        ctx.save_checkpoint(Stage::FileScan, &draft).await?;
        Ok(StageOutcome::advance(String::new(), Stage::SampledCode))
    }

    async fn read_sample(ctx: &StageContext<'_>, path: Option<&str>) -> Option<String> {
        let path = path?;
        match ctx.ports.source.read_file(ctx.instance, path).await {
            Ok(Some(contents)) => Some(contents),
            Ok(None) => {
                warn!(instance = %ctx.instance, %path, "Sample file not found");
                None
            }
            Err(e) => {
                warn!(instance = %ctx.instance, %path, error = %e, "Sample file unreadable");
                None
            }
        }
    }

    async fn sample(ctx: &StageContext<'_>) -> Result<StageOutcome> {
        let current = ctx.load_artifact().await?;
        if current.is_empty() {
            warn!(instance = %ctx.instance, "Blueprint artifact missing before sampling");
        }

        let draft: DraftBlueprint = ctx
            .require_checkpoint(Stage::FileScan, Stage::FileScan)
            .await?;

        let code = Self::read_sample(ctx, draft.sample_source_file.as_deref()).await;
        let project_file = Self::read_sample(ctx, draft.deployment_file.as_deref()).await;
        if code.is_none() && project_file.is_none() {
            return Err(GeneratorError::source(
                "Neither a sample source file nor a project file could be read",
            ));
        }

        let request = RefinementRequest {
            draft: draft.draft.clone(),
            code_file: code.as_ref().and(draft.sample_source_file.clone()),
            code: code.unwrap_or_else(|| NO_CODE.to_string()),
            project_file_name: project_file.as_ref().and(draft.deployment_file.clone()),
            project_file: project_file.unwrap_or_else(|| NO_PROJECT_FILE.to_string()),
        };
        ctx.save_checkpoint(Stage::SampledCode, &request).await?;

        let output = if draft.draft.is_empty() {
            current
        } else {
            draft.draft
        };
        Ok(StageOutcome::advance(output, Stage::BuildingBlueprint))
    }

    async fn refine(ctx: &StageContext<'_>) -> Result<StageOutcome> {
        let request: RefinementRequest = ctx
            .require_checkpoint(Stage::SampledCode, Stage::SampledCode)
            .await?;
        let blueprint = with_timeout(
            ctx.config.long_timeout(),
            "refine blueprint",
            refine_blueprint(ctx.ports.analysis.as_ref(), &request),
        )
        .await?;
        Ok(StageOutcome::advance(blueprint, Stage::Complete))
    }
}

#[async_trait]
impl StageHandler for BlueprintGenerator {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Blueprint
    }

    fn stages(&self) -> &'static [Stage] {
        STAGES
    }

    async fn handle(
        &self,
        ctx: &StageContext<'_>,
        stage: Stage,
        _output: String,
    ) -> Result<StageOutcome> {
        match stage {
            Stage::StaticDefault => Ok(StageOutcome::advance(
                render_blueprint(&ctx.instance.project, UNDETERMINED),
                Stage::FileImport,
            )),
            Stage::FileImport => {
                let files = filtered_paths(ctx, stage).await?;
                ctx.save_checkpoint(Stage::FileImport, &files).await?;
                Ok(StageOutcome::advance(String::new(), Stage::SourceLanguageScan)
                    .with_child_resources(files.len()))
            }
            Stage::SourceLanguageScan => Self::language_scan(ctx).await,
            Stage::FileScan => Self::draft(ctx).await,
            Stage::SampledCode => Self::sample(ctx).await,
            Stage::BuildingBlueprint => Self::refine(ctx).await,
            other => Err(GeneratorError::Defect(format!(
                "blueprint generator cannot handle stage {other}"
            ))),
        }
    }
}
