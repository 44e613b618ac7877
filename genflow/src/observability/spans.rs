//! Span fields and timing for pipeline activations.

use std::collections::HashMap;
use std::time::Instant;
use tracing::field::Empty;
use tracing::Span;
use uuid::Uuid;

use crate::core::{ArtifactKind, PipelineInstance};

/// Fields attached to the span of one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationSpanAttributes {
    /// Unique id of the activation.
    pub activation_id: Uuid,
    /// Display form of the instance.
    pub instance: String,
    /// Artifact kind.
    pub kind: ArtifactKind,
    /// Stage the caller asked for.
    pub requested: Option<String>,
    /// Whether consistency failures of the final write are swallowed.
    pub forced: bool,
}

impl ActivationSpanAttributes {
    /// Creates attributes for a fresh activation.
    #[must_use]
    pub fn new(instance: &PipelineInstance, requested: Option<&str>) -> Self {
        Self {
            activation_id: Uuid::new_v4(),
            instance: instance.to_string(),
            kind: instance.kind,
            requested: requested.map(ToString::to_string),
            forced: false,
        }
    }

    /// Marks the activation as forced.
    #[must_use]
    pub fn with_forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }

    /// Opens the `activation` span. The `stage` field is recorded once the
    /// stage is resolved.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "activation",
            activation_id = %self.activation_id,
            instance = %self.instance,
            kind = %self.kind,
            requested = self.requested.as_deref().unwrap_or("-"),
            forced = self.forced,
            stage = Empty
        )
    }

    /// Flat key/value form for exporters.
    #[must_use]
    pub fn to_fields(&self) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        fields.insert("activation.id".to_string(), self.activation_id.to_string());
        fields.insert("activation.instance".to_string(), self.instance.clone());
        fields.insert("activation.kind".to_string(), self.kind.to_string());
        if let Some(ref v) = self.requested {
            fields.insert("activation.requested".to_string(), v.clone());
        }
        fields.insert("activation.forced".to_string(), self.forced.to_string());
        fields
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// The timer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the timer and returns the elapsed milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_fields() {
        let instance =
            PipelineInstance::new("dev@example.com", "acme", "widgets", ArtifactKind::Blueprint);
        let attrs = ActivationSpanAttributes::new(&instance, Some("FileScan")).with_forced(true);
        let fields = attrs.to_fields();

        assert_eq!(fields["activation.instance"], "acme/widgets:blueprint");
        assert_eq!(fields["activation.kind"], "blueprint");
        assert_eq!(fields["activation.requested"], "FileScan");
        assert_eq!(fields["activation.forced"], "true");
        assert_ne!(
            attrs.activation_id,
            ActivationSpanAttributes::new(&instance, None).activation_id
        );
    }

    #[test]
    fn test_timer() {
        let timer = SpanTimer::start("activation");
        assert_eq!(timer.name(), "activation");
        assert!(timer.finish() >= 0.0);
    }
}
