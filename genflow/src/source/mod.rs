//! Read-only access to a project's files.

mod ignore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use ignore::IgnoreFilter;

use crate::core::{PipelineInstance, ProjectResource, SyncPoint};
use crate::errors::Result;

/// A file and its contents.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the repository root.
    #[serde(default)]
    pub path: String,
    /// File contents.
    #[serde(default)]
    pub source: String,
}

impl SourceFile {
    /// Creates a new source file.
    #[must_use]
    pub fn new(path: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Returns true if the file has both a path and contents.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.path.is_empty() && !self.source.is_empty()
    }
}

/// Source of project files, usually a repository host.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Lists every file path of the project.
    async fn list_files(&self, instance: &PipelineInstance) -> Result<Vec<String>>;

    /// Reads every file of the project with its contents.
    async fn read_files(&self, instance: &PipelineInstance) -> Result<Vec<SourceFile>>;

    /// Returns the project's ignore patterns (gitignore syntax).
    async fn ignore_patterns(&self, instance: &PipelineInstance) -> Result<Vec<String>>;

    /// Returns the current revision of one resource, if known.
    async fn sync_point(
        &self,
        instance: &PipelineInstance,
        resource: &ProjectResource,
    ) -> Result<Option<SyncPoint>>;

    /// Reads one file; `None` if it does not exist.
    async fn read_file(&self, instance: &PipelineInstance, path: &str) -> Result<Option<String>> {
        Ok(self
            .read_files(instance)
            .await?
            .into_iter()
            .find(|file| file.path == path)
            .map(|file| file.source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_file_completeness() {
        assert!(SourceFile::new("src/main.rs", "fn main() {}").is_complete());
        assert!(!SourceFile::new("", "fn main() {}").is_complete());
        assert!(!SourceFile::new("src/empty.rs", "").is_complete());
    }

    #[test]
    fn test_source_file_deserializes_partial() {
        let file: SourceFile = serde_json::from_str(r#"{"path": "a.rs"}"#).unwrap();
        assert_eq!(file.path, "a.rs");
        assert!(!file.is_complete());
    }
}
