//! Repeated activation of one pipeline instance.

use tracing::{info, warn};

use super::engine::PipelineEngine;
use super::progress::ProgressMode;
use crate::core::{PipelineInstance, Stage};
use crate::errors::Result;
use crate::utils::with_timeout;

/// What a drive accomplished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveReport {
    /// Stage returned by each activation, in order.
    pub transitions: Vec<Stage>,
    /// Stage the next activation should run.
    pub next: Stage,
}

impl DriveReport {
    /// Number of activations that ran.
    #[must_use]
    pub fn activations(&self) -> usize {
        self.transitions.len()
    }

    /// Returns true if the pipeline reached `Complete`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.next == Stage::Complete
    }
}

/// Runs activations back to back, the way a scheduler would.
///
/// Each activation is bounded by the configured activation timeout. The
/// driver passes the returned stage explicitly to the next activation, so a
/// progress write lost in forced mode does not replay a stage.
#[derive(Debug)]
pub struct ActivationDriver<'a> {
    engine: &'a PipelineEngine,
    max_activations: usize,
    mode: ProgressMode,
}

impl<'a> ActivationDriver<'a> {
    /// Creates a driver allowing up to 100 activations.
    #[must_use]
    pub const fn new(engine: &'a PipelineEngine) -> Self {
        Self {
            engine,
            max_activations: 100,
            mode: ProgressMode::Strict,
        }
    }

    /// Sets the activation limit.
    #[must_use]
    pub const fn with_max_activations(mut self, max: usize) -> Self {
        self.max_activations = max;
        self
    }

    /// Sets the progress mode of every activation.
    #[must_use]
    pub const fn with_mode(mut self, mode: ProgressMode) -> Self {
        self.mode = mode;
        self
    }

    /// Activates until `Complete`, the activation limit, or an error.
    pub async fn run(&self, instance: &PipelineInstance, start: Option<Stage>) -> Result<DriveReport> {
        let mut requested = start.map(|stage| stage.to_string());
        let mut transitions = Vec::new();
        let mut next = start.unwrap_or(Stage::Reset);

        while transitions.len() < self.max_activations {
            let current = requested.as_deref();
            next = with_timeout(
                self.engine.config().activation_timeout(),
                "pipeline activation",
                self.engine.activate(instance, current, self.mode),
            )
            .await?;

            transitions.push(next);
            if next == Stage::Complete {
                info!(instance = %instance, activations = transitions.len(), "Pipeline complete");
                return Ok(DriveReport { transitions, next });
            }
            requested = Some(next.to_string());
        }

        warn!(
            instance = %instance,
            activations = transitions.len(),
            %next,
            "Activation limit reached"
        );
        Ok(DriveReport { transitions, next })
    }
}
