//! Collaborators injected into the engine and every stage.

use std::sync::Arc;

use crate::analysis::AnalysisClient;
use crate::source::SourceProvider;
use crate::stores::{ArtifactStore, CheckpointStore, ProgressReporter};

/// The external collaborators a pipeline runs against.
#[derive(Clone)]
pub struct PipelinePorts {
    /// Scratch data between activations.
    pub checkpoints: Arc<dyn CheckpointStore>,
    /// Final artifact text.
    pub artifacts: Arc<dyn ArtifactStore>,
    /// Progress record.
    pub progress: Arc<dyn ProgressReporter>,
    /// Project files.
    pub source: Arc<dyn SourceProvider>,
    /// Content analysis.
    pub analysis: Arc<dyn AnalysisClient>,
}

impl std::fmt::Debug for PipelinePorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelinePorts").finish_non_exhaustive()
    }
}

impl PipelinePorts {
    /// Creates ports from their parts.
    #[must_use]
    pub fn new(
        checkpoints: Arc<dyn CheckpointStore>,
        artifacts: Arc<dyn ArtifactStore>,
        progress: Arc<dyn ProgressReporter>,
        source: Arc<dyn SourceProvider>,
        analysis: Arc<dyn AnalysisClient>,
    ) -> Self {
        Self {
            checkpoints,
            artifacts,
            progress,
            source,
            analysis,
        }
    }

    /// Replaces the progress reporter.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }
}
