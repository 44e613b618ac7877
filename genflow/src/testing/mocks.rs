//! Scripted collaborators for driving pipelines in tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use crate::analysis::{AnalysisClient, Capability};
use crate::core::{PipelineInstance, ProjectResource, SyncPoint};
use crate::errors::{AnalysisError, GeneratorError, Result};
use crate::source::{SourceFile, SourceProvider};

/// A source provider serving a fixed set of files.
#[derive(Debug, Default)]
pub struct StaticSourceProvider {
    files: Mutex<Vec<SourceFile>>,
    ignore_patterns: Vec<String>,
    sync_points: HashMap<String, SyncPoint>,
    failing_sync: HashSet<String>,
    sync_delay: Option<Duration>,
    read_delay: Option<Duration>,
    unavailable: bool,
    list_calls: Mutex<usize>,
    read_calls: Mutex<usize>,
}

impl StaticSourceProvider {
    /// Creates a provider with no files.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file.
    #[must_use]
    pub fn with_file(self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.files.lock().push(SourceFile::new(path, source));
        self
    }

    /// Adds several files.
    #[must_use]
    pub fn with_files(self, files: impl IntoIterator<Item = SourceFile>) -> Self {
        self.files.lock().extend(files);
        self
    }

    /// Sets the ignore patterns.
    #[must_use]
    pub fn with_ignore_patterns<S: Into<String>>(
        mut self,
        patterns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.ignore_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the revision reported for a resource.
    #[must_use]
    pub fn with_sync_point(mut self, uri: impl Into<String>, point: SyncPoint) -> Self {
        self.sync_points.insert(uri.into(), point);
        self
    }

    /// Makes revision lookups for a resource fail.
    #[must_use]
    pub fn with_failing_sync(mut self, uri: impl Into<String>) -> Self {
        self.failing_sync.insert(uri.into());
        self
    }

    /// Delays every revision lookup.
    #[must_use]
    pub fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.sync_delay = Some(delay);
        self
    }

    /// Delays every listing and bulk read.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Makes listing and reading fail.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Replaces the served files.
    pub fn set_files(&self, files: Vec<SourceFile>) {
        *self.files.lock() = files;
    }

    /// Number of `list_files` calls.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock()
    }

    /// Number of `read_files` calls.
    #[must_use]
    pub fn read_calls(&self) -> usize {
        *self.read_calls.lock()
    }

    async fn before_read(&self) -> Result<()> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable {
            return Err(GeneratorError::source("repository unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl SourceProvider for StaticSourceProvider {
    async fn list_files(&self, _instance: &PipelineInstance) -> Result<Vec<String>> {
        *self.list_calls.lock() += 1;
        self.before_read().await?;
        Ok(self.files.lock().iter().map(|f| f.path.clone()).collect())
    }

    async fn read_files(&self, _instance: &PipelineInstance) -> Result<Vec<SourceFile>> {
        *self.read_calls.lock() += 1;
        self.before_read().await?;
        Ok(self.files.lock().clone())
    }

    async fn ignore_patterns(&self, _instance: &PipelineInstance) -> Result<Vec<String>> {
        Ok(self.ignore_patterns.clone())
    }

    async fn sync_point(
        &self,
        _instance: &PipelineInstance,
        resource: &ProjectResource,
    ) -> Result<Option<SyncPoint>> {
        if let Some(delay) = self.sync_delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_sync.contains(&resource.uri) {
            return Err(GeneratorError::source(format!(
                "no access to {}",
                resource.uri
            )));
        }
        Ok(self.sync_points.get(&resource.uri).cloned())
    }

    async fn read_file(&self, _instance: &PipelineInstance, path: &str) -> Result<Option<String>> {
        Ok(self
            .files
            .lock()
            .iter()
            .find(|f| f.path == path)
            .map(|f| f.source.clone()))
    }
}

/// An analysis client answering from a script.
///
/// Queued responses are served per capability in order. When the queue of
/// `summarize-file` is empty, the client answers with a summary derived from
/// the file path; other capabilities fail once their queue runs dry.
#[derive(Debug, Default)]
pub struct ScriptedAnalysisClient {
    responses: Mutex<HashMap<Capability, VecDeque<std::result::Result<serde_json::Value, AnalysisError>>>>,
    failing_paths: Mutex<HashSet<String>>,
    calls: Mutex<Vec<(Capability, serde_json::Value)>>,
}

impl ScriptedAnalysisClient {
    /// Creates a client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn push_ok(&self, capability: Capability, response: serde_json::Value) {
        self.responses
            .lock()
            .entry(capability)
            .or_default()
            .push_back(Ok(response));
    }

    /// Queues a failure.
    pub fn push_err(&self, capability: Capability, error: AnalysisError) {
        self.responses
            .lock()
            .entry(capability)
            .or_default()
            .push_back(Err(error));
    }

    /// Makes every summarization of `path` fail.
    pub fn fail_path(&self, path: impl Into<String>) {
        self.failing_paths.lock().insert(path.into());
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(Capability, serde_json::Value)> {
        self.calls.lock().clone()
    }

    /// Number of calls to one capability.
    #[must_use]
    pub fn call_count(&self, capability: Capability) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(c, _)| *c == capability)
            .count()
    }

    /// Paths sent to `summarize-file`, in order.
    #[must_use]
    pub fn summarized_paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(c, _)| *c == Capability::SummarizeFile)
            .filter_map(|(_, request)| request["filepath"].as_str().map(ToString::to_string))
            .collect()
    }
}

#[async_trait]
impl AnalysisClient for ScriptedAnalysisClient {
    async fn call(
        &self,
        capability: Capability,
        request: serde_json::Value,
    ) -> Result<serde_json::Value> {
        self.calls.lock().push((capability, request.clone()));

        if capability == Capability::SummarizeFile {
            let path = request["filepath"].as_str().unwrap_or_default();
            if self.failing_paths.lock().contains(path) {
                return Err(AnalysisError::new(capability.as_str(), format!("cannot summarize {path}"))
                    .with_status(500)
                    .into());
            }
        }

        let scripted = self
            .responses
            .lock()
            .get_mut(&capability)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(error)) => Err(error.into()),
            None if capability == Capability::SummarizeFile => {
                let path = request["filepath"].as_str().unwrap_or_default();
                Ok(serde_json::json!({
                    "status": "success",
                    "summary": format!("Summary of {path}"),
                }))
            }
            None => Err(AnalysisError::new(capability.as_str(), "no scripted response").into()),
        }
    }
}
