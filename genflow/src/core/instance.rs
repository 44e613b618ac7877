//! Identity of one running pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Stage;

/// The artifact a pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Aggregated project source.
    Source,
    /// Per-file architectural specification.
    Specification,
    /// Architectural blueprint.
    Blueprint,
}

impl ArtifactKind {
    /// Returns the storage name of the artifact kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Specification => "specification",
            Self::Blueprint => "blueprint",
        }
    }

    /// Returns the file name the artifact is published under.
    #[must_use]
    pub const fn file_name(&self) -> &'static str {
        match self {
            Self::Source => "allfiles_combined.md",
            Self::Specification => "aispec.md",
            Self::Blueprint => "blueprint.md",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the account may access a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAccess {
    /// Publicly readable.
    Public,
    /// Requires credentials.
    Private,
    /// Not yet determined.
    #[default]
    Unknown,
    /// Access check failed.
    Error,
}

/// A source repository or reference attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectResource {
    /// Location of the resource (e.g. a repository URL).
    pub uri: String,
    /// Resource role, such as `primary_read` or `reference_read`.
    #[serde(rename = "type", default = "default_resource_type")]
    pub resource_type: String,
    /// Access level.
    #[serde(default)]
    pub access: ResourceAccess,
}

fn default_resource_type() -> String {
    "primary_read".to_string()
}

impl ProjectResource {
    /// Creates a primary read-only resource.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            resource_type: default_resource_type(),
            access: ResourceAccess::Unknown,
        }
    }
}

/// Identifies one pipeline: who owns it, which project, which artifact.
///
/// Every storage key is derived from the instance, so no two instances ever
/// share checkpoints, artifacts or progress records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInstance {
    /// Owning account.
    pub account: String,
    /// Organization or namespace.
    pub org: String,
    /// Project name.
    pub project: String,
    /// Artifact produced by this pipeline.
    pub kind: ArtifactKind,
    /// Resources the project is built from.
    #[serde(default)]
    pub resources: Vec<ProjectResource>,
}

impl PipelineInstance {
    /// Creates a new pipeline instance without resources.
    #[must_use]
    pub fn new(
        account: impl Into<String>,
        org: impl Into<String>,
        project: impl Into<String>,
        kind: ArtifactKind,
    ) -> Self {
        Self {
            account: account.into(),
            org: org.into(),
            project: project.into(),
            kind,
            resources: Vec::new(),
        }
    }

    /// Adds a resource.
    #[must_use]
    pub fn with_resource(mut self, resource: ProjectResource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Returns the same project with a different artifact kind.
    #[must_use]
    pub fn for_kind(&self, kind: ArtifactKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }

    /// Key under which the artifact and progress record are stored.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!(
            "{}/{}/{}/data/{}",
            self.account, self.org, self.project, self.kind
        )
    }

    /// Key under which a stage's scratch data is stored.
    #[must_use]
    pub fn checkpoint_key(&self, stage: Stage) -> String {
        format!("{}/scratch/{}", self.storage_key(), stage)
    }

    /// URIs of all resources, one per line.
    #[must_use]
    pub fn resource_uris(&self) -> String {
        self.resources
            .iter()
            .map(|r| r.uri.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for PipelineInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.org, self.project, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> PipelineInstance {
        PipelineInstance::new("dev@example.com", "acme", "widgets", ArtifactKind::Blueprint)
            .with_resource(ProjectResource::new("https://github.com/acme/widgets"))
    }

    #[test]
    fn test_storage_keys_are_partitioned() {
        let blueprint = instance();
        let source = blueprint.for_kind(ArtifactKind::Source);

        assert_eq!(
            blueprint.storage_key(),
            "dev@example.com/acme/widgets/data/blueprint"
        );
        assert_ne!(blueprint.storage_key(), source.storage_key());
        assert_eq!(
            blueprint.checkpoint_key(Stage::FileScan),
            "dev@example.com/acme/widgets/data/blueprint/scratch/FileScan"
        );
        assert_ne!(
            blueprint.checkpoint_key(Stage::FileScan),
            blueprint.checkpoint_key(Stage::SampledCode)
        );
    }

    #[test]
    fn test_resource_deserializes_with_defaults() {
        let resource: ProjectResource =
            serde_json::from_str(r#"{"uri": "https://github.com/acme/widgets"}"#).unwrap();
        assert_eq!(resource.resource_type, "primary_read");
        assert_eq!(resource.access, ResourceAccess::Unknown);
    }

    #[test]
    fn test_display() {
        assert_eq!(instance().to_string(), "acme/widgets:blueprint");
        assert_eq!(ArtifactKind::Specification.file_name(), "aispec.md");
    }
}
