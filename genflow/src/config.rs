//! Generator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{GeneratorError, Result};

/// Configuration shared by every pipeline variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Skip AI summarization in the specification pipeline.
    #[serde(default)]
    pub skip_ai_analysis: bool,
    /// Run the AI-assisted blueprint branch.
    #[serde(default)]
    pub deep_analysis: bool,
    /// Stop per-file loops after one file (testing aid).
    #[serde(default)]
    pub single_shot: bool,
    /// Timeout for auxiliary lookups, such as sync points, in seconds.
    #[serde(default = "default_short_timeout")]
    pub short_timeout_seconds: f64,
    /// Timeout for bulk source retrieval in seconds.
    #[serde(default = "default_long_timeout")]
    pub long_timeout_seconds: f64,
    /// Timeout for one whole activation in seconds.
    #[serde(default = "default_activation_timeout")]
    pub activation_timeout_seconds: f64,
    /// File lists at or above this size are rejected.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Abort thresholds for per-file analysis.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_short_timeout() -> f64 {
    5.0
}

fn default_long_timeout() -> f64 {
    120.0
}

fn default_activation_timeout() -> f64 {
    600.0
}

fn default_max_files() -> usize {
    1000
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            skip_ai_analysis: false,
            deep_analysis: false,
            single_shot: false,
            short_timeout_seconds: default_short_timeout(),
            long_timeout_seconds: default_long_timeout(),
            activation_timeout_seconds: default_activation_timeout(),
            max_files: default_max_files(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl GeneratorConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration document; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Creates configuration from environment variables.
    ///
    /// Recognized variables: `GENFLOW_SKIP_AI_ANALYSIS`,
    /// `GENFLOW_DEEP_ANALYSIS`, `GENFLOW_SINGLE_SHOT`,
    /// `GENFLOW_SHORT_TIMEOUT_SECS`, `GENFLOW_LONG_TIMEOUT_SECS`,
    /// `GENFLOW_ACTIVATION_TIMEOUT_SECS` and `GENFLOW_MAX_FILES`. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("GENFLOW_SKIP_AI_ANALYSIS") {
            config.skip_ai_analysis = parse_flag("GENFLOW_SKIP_AI_ANALYSIS", &v)?;
        }
        if let Some(v) = lookup("GENFLOW_DEEP_ANALYSIS") {
            config.deep_analysis = parse_flag("GENFLOW_DEEP_ANALYSIS", &v)?;
        }
        if let Some(v) = lookup("GENFLOW_SINGLE_SHOT") {
            config.single_shot = parse_flag("GENFLOW_SINGLE_SHOT", &v)?;
        }
        if let Some(v) = lookup("GENFLOW_SHORT_TIMEOUT_SECS") {
            config.short_timeout_seconds = parse_value("GENFLOW_SHORT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("GENFLOW_LONG_TIMEOUT_SECS") {
            config.long_timeout_seconds = parse_value("GENFLOW_LONG_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("GENFLOW_ACTIVATION_TIMEOUT_SECS") {
            config.activation_timeout_seconds =
                parse_value("GENFLOW_ACTIVATION_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("GENFLOW_MAX_FILES") {
            config.max_files = parse_value("GENFLOW_MAX_FILES", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("short_timeout_seconds", self.short_timeout_seconds),
            ("long_timeout_seconds", self.long_timeout_seconds),
            ("activation_timeout_seconds", self.activation_timeout_seconds),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GeneratorError::Configuration(format!(
                    "{name} must be a positive number of seconds, got {value}"
                )));
            }
        }
        if self.max_files == 0 {
            return Err(GeneratorError::Configuration(
                "max_files must be greater than zero".to_string(),
            ));
        }
        self.failure_policy.validate()
    }

    /// Skips AI summarization.
    #[must_use]
    pub fn with_skip_ai_analysis(mut self, skip: bool) -> Self {
        self.skip_ai_analysis = skip;
        self
    }

    /// Enables the AI-assisted blueprint branch.
    #[must_use]
    pub fn with_deep_analysis(mut self, enabled: bool) -> Self {
        self.deep_analysis = enabled;
        self
    }

    /// Stops per-file loops after one file.
    #[must_use]
    pub fn with_single_shot(mut self, single_shot: bool) -> Self {
        self.single_shot = single_shot;
        self
    }

    /// Sets the auxiliary lookup timeout.
    #[must_use]
    pub fn with_short_timeout(mut self, seconds: f64) -> Self {
        self.short_timeout_seconds = seconds;
        self
    }

    /// Sets the bulk retrieval timeout.
    #[must_use]
    pub fn with_long_timeout(mut self, seconds: f64) -> Self {
        self.long_timeout_seconds = seconds;
        self
    }

    /// Sets the file list limit.
    #[must_use]
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Sets the abort thresholds.
    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Auxiliary lookup timeout as a Duration.
    #[must_use]
    pub fn short_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.short_timeout_seconds)
    }

    /// Bulk retrieval timeout as a Duration.
    #[must_use]
    pub fn long_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.long_timeout_seconds)
    }

    /// Activation timeout as a Duration.
    #[must_use]
    pub fn activation_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.activation_timeout_seconds)
    }
}

/// Thresholds that decide when per-file failures abort a pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePolicy {
    /// Abort once the consecutive-error streak exceeds this.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: usize,
    /// Projects with more files than this use the ratio rule.
    #[serde(default = "default_small_project_files")]
    pub small_project_files: usize,
    /// Abort once errors exceed this share of all files (large projects).
    #[serde(default = "default_max_error_ratio")]
    pub max_error_ratio: f64,
    /// Abort once errors exceed this count (small projects).
    #[serde(default = "default_small_project_max_errors")]
    pub small_project_max_errors: usize,
}

fn default_max_consecutive_errors() -> usize {
    5
}

fn default_small_project_files() -> usize {
    10
}

fn default_max_error_ratio() -> f64 {
    0.25
}

fn default_small_project_max_errors() -> usize {
    2
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            max_consecutive_errors: default_max_consecutive_errors(),
            small_project_files: default_small_project_files(),
            max_error_ratio: default_max_error_ratio(),
            small_project_max_errors: default_small_project_max_errors(),
        }
    }
}

impl FailurePolicy {
    /// Checks that the ratio is a usable fraction.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_error_ratio > 0.0 && self.max_error_ratio <= 1.0) {
            return Err(GeneratorError::Configuration(format!(
                "max_error_ratio must be in (0, 1], got {}",
                self.max_error_ratio
            )));
        }
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(GeneratorError::Configuration(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        GeneratorError::Configuration(format!("{name} has an invalid value: '{value}'"))
    })
}
