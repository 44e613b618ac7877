//! The activation engine.
//!
//! One call to [`PipelineEngine::advance`] executes exactly one stage of one
//! pipeline instance:
//!
//! 1. read the progress record and remember its version,
//! 2. resolve the stage to run (explicit request, else the stored stage,
//!    else `Reset`; `Reset` runs as `StaticDefault`),
//! 3. run the variant's handler,
//! 4. persist a non-empty output as the artifact,
//! 5. report the transition, guarded by the remembered version.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, Instrument, Span};

use super::progress::{report_stage, ProgressMode, StageReport};
use crate::config::GeneratorConfig;
use crate::core::{ArtifactKind, PipelineInstance, Stage};
use crate::errors::{GeneratorError, Result};
use crate::generators::default_handlers;
use crate::observability::{ActivationSpanAttributes, SpanTimer};
use crate::stages::{PipelinePorts, StageContext, StageHandler};
use crate::stores::artifact_digest;

/// Advances pipeline instances one stage per activation.
#[derive(Debug, Clone)]
pub struct PipelineEngine {
    ports: PipelinePorts,
    config: GeneratorConfig,
    handlers: HashMap<ArtifactKind, Arc<dyn StageHandler>>,
}

impl PipelineEngine {
    /// Creates an engine with the built-in variants.
    #[must_use]
    pub fn new(ports: PipelinePorts, config: GeneratorConfig) -> Self {
        let handlers = default_handlers()
            .into_iter()
            .map(|handler| (handler.kind(), handler))
            .collect();
        Self {
            ports,
            config,
            handlers,
        }
    }

    /// Replaces the handler for the handler's artifact kind.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn StageHandler>) -> Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns the collaborators.
    #[must_use]
    pub fn ports(&self) -> &PipelinePorts {
        &self.ports
    }

    /// Executes one stage and returns the next stage to run.
    ///
    /// `stage` names the stage to run; `None` resumes from the progress
    /// record. Returns `Complete` without side effects if the pipeline is
    /// already finished.
    pub async fn advance(&self, instance: &PipelineInstance, stage: Option<&str>) -> Result<Stage> {
        self.activate(instance, stage, ProgressMode::Strict).await
    }

    /// Like [`advance`](Self::advance), but a final progress write that loses
    /// a consistency check is logged instead of failing the activation.
    pub async fn advance_forced(
        &self,
        instance: &PipelineInstance,
        stage: Option<&str>,
    ) -> Result<Stage> {
        self.activate(instance, stage, ProgressMode::Forced).await
    }

    /// Executes one stage under the given progress mode.
    pub async fn activate(
        &self,
        instance: &PipelineInstance,
        stage: Option<&str>,
        mode: ProgressMode,
    ) -> Result<Stage> {
        let span = ActivationSpanAttributes::new(instance, stage)
            .with_forced(mode == ProgressMode::Forced)
            .span();
        self.run_activation(instance, stage, mode)
            .instrument(span)
            .await
    }

    async fn run_activation(
        &self,
        instance: &PipelineInstance,
        requested: Option<&str>,
        mode: ProgressMode,
    ) -> Result<Stage> {
        let timer = SpanTimer::start("activation");
        let handler = self.handlers.get(&instance.kind).ok_or_else(|| {
            GeneratorError::Configuration(format!("No generator for {}", instance.kind))
        })?;

        let record = self.ports.progress.read(instance).await?;
        let expected_version = record.as_ref().map(|r| r.version);

        let stage = match requested {
            Some(name) => name
                .parse::<Stage>()
                .map_err(|e| GeneratorError::processing(e.to_string(), Stage::Reset))?,
            None => record.and_then(|r| r.stage).unwrap_or(Stage::Reset),
        };

        if stage == Stage::Complete {
            info!("Pipeline already complete");
            return Ok(Stage::Complete);
        }

        let reset = stage == Stage::Reset;
        let stage = if reset { Stage::StaticDefault } else { stage };
        Span::current().record("stage", stage.as_str());
        if !handler.declares(stage) {
            if stage == Stage::StaticDefault {
                return Err(GeneratorError::Defect(format!(
                    "{} generator does not declare {}",
                    instance.kind,
                    Stage::StaticDefault
                )));
            }
            return Err(GeneratorError::processing(
                format!("Stage {stage} is not a {} stage", instance.kind),
                Stage::Reset,
            ));
        }

        info!(%stage, reset, "Executing stage");
        let ctx = StageContext::new(instance, &self.ports, &self.config);
        let outcome = handler.handle(&ctx, stage, String::new()).await?;
        let next = outcome.next.ok_or_else(|| {
            GeneratorError::Defect(format!(
                "{} generator returned no next stage after {stage}",
                instance.kind
            ))
        })?;

        let digest = if outcome.output.is_empty() {
            None
        } else {
            self.ports.artifacts.save(instance, &outcome.output).await?;
            debug!(bytes = outcome.output.len(), "Saved artifact");
            Some(artifact_digest(&outcome.output))
        };

        let report = StageReport {
            stage,
            next,
            expected_version,
            reset,
            stages_remaining: handler.stages_remaining(next),
            hints: outcome.hints,
            artifact_digest: digest,
        };
        report_stage(self.ports.progress.as_ref(), instance, &report, mode).await?;

        info!(
            %stage,
            %next,
            elapsed_ms = timer.finish(),
            "Stage finished"
        );
        Ok(next)
    }
}
