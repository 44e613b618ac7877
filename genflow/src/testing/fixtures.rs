//! A pipeline wired to in-memory collaborators.

use std::sync::Arc;

use super::mocks::{ScriptedAnalysisClient, StaticSourceProvider};
use crate::config::GeneratorConfig;
use crate::core::{ArtifactKind, GeneratorState, PipelineInstance, ProjectResource, Stage};
use crate::errors::Result;
use crate::pipeline::{ActivationDriver, DriveReport, PipelineEngine};
use crate::source::SourceFile;
use crate::stages::{PipelinePorts, StageContext};
use crate::stores::{
    InMemoryArtifactStore, InMemoryCheckpointStore, InMemoryProgressReporter, ProgressReporter,
};

/// Test harness: one instance, in-memory stores, scripted collaborators.
///
/// Fields stay public so tests can inspect or seed the stores directly.
#[derive(Debug)]
pub struct TestHarness {
    /// The instance under test.
    pub instance: PipelineInstance,
    /// Configuration handed to stages.
    pub config: GeneratorConfig,
    /// Scratch store.
    pub checkpoints: Arc<InMemoryCheckpointStore>,
    /// Artifact store.
    pub artifacts: Arc<InMemoryArtifactStore>,
    /// Progress store.
    pub progress: Arc<InMemoryProgressReporter>,
    /// Project files.
    pub source: Arc<StaticSourceProvider>,
    /// Analysis service.
    pub analysis: Arc<ScriptedAnalysisClient>,
    ports: PipelinePorts,
}

impl TestHarness {
    /// Creates a harness for `acme/widgets` with one GitHub resource.
    #[must_use]
    pub fn new(kind: ArtifactKind) -> Self {
        let instance = PipelineInstance::new("dev@example.com", "acme", "widgets", kind)
            .with_resource(ProjectResource::new("https://github.com/acme/widgets"));
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let artifacts = Arc::new(InMemoryArtifactStore::new());
        let progress = Arc::new(InMemoryProgressReporter::new());
        let source = Arc::new(StaticSourceProvider::new());
        let analysis = Arc::new(ScriptedAnalysisClient::new());
        let ports = PipelinePorts::new(
            checkpoints.clone(),
            artifacts.clone(),
            progress.clone(),
            source.clone(),
            analysis.clone(),
        );

        Self {
            instance,
            config: GeneratorConfig::default(),
            checkpoints,
            artifacts,
            progress,
            source,
            analysis,
            ports,
        }
    }

    /// Serves files from `source`.
    #[must_use]
    pub fn with_source(mut self, source: StaticSourceProvider) -> Self {
        self.source = Arc::new(source);
        self.ports.source = self.source.clone();
        self
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Rewrites the instance.
    #[must_use]
    pub fn with_instance(mut self, f: impl FnOnce(PipelineInstance) -> PipelineInstance) -> Self {
        self.instance = f(self.instance);
        self
    }

    /// Routes progress through another reporter, such as a mock. The
    /// in-memory reporter stays reachable but is no longer written.
    #[must_use]
    pub fn with_progress_reporter(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.ports = self.ports.with_progress(progress);
        self
    }

    /// The collaborators as the engine sees them.
    #[must_use]
    pub fn ports(&self) -> &PipelinePorts {
        &self.ports
    }

    /// A stage context for calling handlers directly.
    #[must_use]
    pub fn context(&self) -> StageContext<'_> {
        StageContext::new(&self.instance, &self.ports, &self.config)
    }

    /// An engine over the harness collaborators.
    #[must_use]
    pub fn engine(&self) -> PipelineEngine {
        PipelineEngine::new(self.ports.clone(), self.config.clone())
    }

    /// Runs one activation.
    pub async fn advance(&self, stage: Option<&str>) -> Result<Stage> {
        self.engine().advance(&self.instance, stage).await
    }

    /// Runs one forced activation.
    pub async fn advance_forced(&self, stage: Option<&str>) -> Result<Stage> {
        self.engine().advance_forced(&self.instance, stage).await
    }

    /// Activates until `Complete` or `max_activations`.
    pub async fn drive(&self, max_activations: usize) -> Result<DriveReport> {
        let engine = self.engine();
        ActivationDriver::new(&engine)
            .with_max_activations(max_activations)
            .run(&self.instance, None)
            .await
    }

    /// The stored progress record.
    #[must_use]
    pub fn state(&self) -> Option<GeneratorState> {
        self.progress.get(&self.instance)
    }

    /// The stored artifact.
    #[must_use]
    pub fn artifact(&self) -> Option<String> {
        self.artifacts.get(&self.instance)
    }
}

/// A small Rust project: five sources, a manifest, docs and build output.
#[must_use]
pub fn sample_rust_project() -> StaticSourceProvider {
    StaticSourceProvider::new()
        .with_files(sample_rust_files())
        .with_ignore_patterns(["# build output", "target/", "*.log"])
}

/// Files of [`sample_rust_project`].
#[must_use]
pub fn sample_rust_files() -> Vec<SourceFile> {
    vec![
        SourceFile::new("Cargo.toml", "[package]\nname = \"widgets\"\nversion = \"0.1.0\"\n"),
        SourceFile::new("README.md", "# widgets\n\nA widget toolkit.\n"),
        SourceFile::new("src/main.rs", "fn main() {\n    widgets::run();\n}\n"),
        SourceFile::new("src/lib.rs", "pub mod render;\npub mod layout;\n\npub fn run() {}\n"),
        SourceFile::new("src/render.rs", "pub fn draw() {}\n"),
        SourceFile::new("src/layout.rs", "pub fn measure() -> u32 { 0 }\n"),
        SourceFile::new("tests/smoke.rs", "#[test]\nfn smoke() {}\n"),
        SourceFile::new("target/debug/widgets", "\u{7f}ELF"),
        SourceFile::new("build.log", "Compiling widgets v0.1.0\n"),
    ]
}
