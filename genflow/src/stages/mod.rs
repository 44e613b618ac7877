//! The contract between the engine and a pipeline variant.
//!
//! A variant is a [`StageHandler`]: given the current stage and the output
//! accumulated so far in this activation, it returns the new output and the
//! next stage. Everything a handler needs from the outside world is reached
//! through its [`StageContext`].

mod ports;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

pub use ports::PipelinePorts;

use crate::config::GeneratorConfig;
use crate::core::{ArtifactKind, PipelineInstance, ResourceSyncState, Stage};
use crate::errors::{GeneratorError, Result};

/// Stage logic of one pipeline variant.
#[async_trait]
pub trait StageHandler: Send + Sync + Debug {
    /// The artifact this variant produces.
    fn kind(&self) -> ArtifactKind;

    /// Stages this variant owns, starting with `StaticDefault`, in their
    /// nominal order. `Complete` is implied.
    fn stages(&self) -> &'static [Stage];

    /// Returns true if the variant owns the stage.
    fn declares(&self, stage: Stage) -> bool {
        self.stages().contains(&stage)
    }

    /// Estimate of how many stages remain once `next` is reached.
    fn stages_remaining(&self, next: Stage) -> usize {
        let stages = self.stages();
        stages
            .iter()
            .position(|s| *s == next)
            .map_or(0, |pos| stages.len() - pos)
    }

    /// Executes one stage.
    async fn handle(
        &self,
        ctx: &StageContext<'_>,
        stage: Stage,
        output: String,
    ) -> Result<StageOutcome>;
}

/// Optional progress details a stage reports alongside its transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressHints {
    /// Number of child resources, such as files.
    pub child_resources: Option<usize>,
    /// Per-resource sync status.
    pub resources_state: Option<Vec<ResourceSyncState>>,
}

/// What a stage produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageOutcome {
    /// Accumulated output; persisted when non-empty.
    pub output: String,
    /// Successor stage. `None` is a handler defect.
    pub next: Option<Stage>,
    /// Progress details.
    pub hints: ProgressHints,
}

impl StageOutcome {
    /// Moves on to `next` with the given output.
    #[must_use]
    pub fn advance(output: String, next: Stage) -> Self {
        Self {
            output,
            next: Some(next),
            hints: ProgressHints::default(),
        }
    }

    /// Sets the child resource count.
    #[must_use]
    pub fn with_child_resources(mut self, count: usize) -> Self {
        self.hints.child_resources = Some(count);
        self
    }

    /// Sets the per-resource sync status.
    #[must_use]
    pub fn with_resources_state(mut self, state: Vec<ResourceSyncState>) -> Self {
        self.hints.resources_state = Some(state);
        self
    }
}

/// Everything a stage may touch during one activation.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    /// The pipeline being advanced.
    pub instance: &'a PipelineInstance,
    /// Collaborators.
    pub ports: &'a PipelinePorts,
    /// Configuration.
    pub config: &'a GeneratorConfig,
}

impl<'a> StageContext<'a> {
    /// Creates a new stage context.
    #[must_use]
    pub const fn new(
        instance: &'a PipelineInstance,
        ports: &'a PipelinePorts,
        config: &'a GeneratorConfig,
    ) -> Self {
        Self {
            instance,
            ports,
            config,
        }
    }

    /// Saves the scratch entry of `stage`.
    pub async fn save_checkpoint<T: Serialize + Sync>(&self, stage: Stage, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        tracing::debug!(instance = %self.instance, %stage, "Saving checkpoint");
        self.ports.checkpoints.save(self.instance, stage, value).await
    }

    /// Loads the scratch entry of `stage`, if present.
    pub async fn load_checkpoint<T: DeserializeOwned>(&self, stage: Stage) -> Result<Option<T>> {
        tracing::debug!(instance = %self.instance, %stage, "Loading checkpoint");
        match self.ports.checkpoints.load(self.instance, stage).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Loads the scratch entry of `stage`; a missing or unreadable entry is a
    /// recoverable error resuming at `resume`.
    pub async fn require_checkpoint<T: DeserializeOwned>(
        &self,
        stage: Stage,
        resume: Stage,
    ) -> Result<T> {
        match self.load_checkpoint(stage).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(GeneratorError::processing(
                format!("No checkpoint data for stage {stage}"),
                resume,
            )),
            Err(GeneratorError::Serialization(e)) => Err(GeneratorError::processing(
                format!("Invalid checkpoint data for stage {stage}: {e}"),
                resume,
            )),
            Err(e) => Err(e),
        }
    }

    /// Loads the current artifact; a never-generated artifact is empty.
    pub async fn load_artifact(&self) -> Result<String> {
        Ok(self
            .ports
            .artifacts
            .load(self.instance)
            .await?
            .unwrap_or_default())
    }

    /// Saves the artifact directly, outside the engine's end-of-stage save.
    pub async fn save_artifact(&self, content: &str) -> Result<()> {
        self.ports.artifacts.save(self.instance, content).await
    }
}
