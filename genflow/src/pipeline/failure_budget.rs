//! Failure tolerance for per-file analysis loops.
//!
//! A [`FailureBudget`] counts analysis failures across activations (it is
//! persisted alongside the work queue) and decides, against a
//! [`FailurePolicy`], when the loop should stop.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::FailurePolicy;

/// Why a per-file loop was stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// Too many failures in a row.
    ConsecutiveErrors {
        /// Length of the current streak.
        streak: usize,
    },
    /// Failures exceed the allowed share of a large project.
    ErrorRatio {
        /// Failures so far.
        errors: usize,
        /// Files in the project.
        total: usize,
    },
    /// Failures exceed the allowed count of a small project.
    SmallProjectErrors {
        /// Failures so far.
        errors: usize,
        /// Files in the project.
        total: usize,
    },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConsecutiveErrors { streak } => {
                write!(f, "Aborting after {streak} consecutive analysis failures")
            }
            Self::ErrorRatio { errors, total } => write!(
                f,
                "Aborting: {errors} of {total} files failed analysis"
            ),
            Self::SmallProjectErrors { errors, total } => write!(
                f,
                "Aborting: {errors} failures in a project of {total} files"
            ),
        }
    }
}

/// Failure counters of one per-file loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBudget {
    /// Files queued when the loop started.
    pub total_files: usize,
    /// Files analyzed successfully so far.
    #[serde(default)]
    pub processed: usize,
    /// Failed analyses so far.
    #[serde(default)]
    pub errors: usize,
    /// Failures since the last success.
    #[serde(default)]
    pub consecutive_errors: usize,
    /// Paths whose analysis failed.
    #[serde(default)]
    pub failed_files: Vec<String>,
}

impl FailureBudget {
    /// Creates a budget for a loop over `total_files` files.
    #[must_use]
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Self::default()
        }
    }

    /// Records a successful analysis.
    pub fn record_success(&mut self) {
        self.processed += 1;
        self.consecutive_errors = 0;
    }

    /// Records a failed analysis.
    pub fn record_failure(&mut self, path: impl Into<String>) {
        self.errors += 1;
        self.consecutive_errors += 1;
        self.failed_files.push(path.into());
    }

    /// Returns true if any analysis failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.errors > 0
    }

    /// Share of analyzed files that succeeded.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        let attempted = self.processed + self.errors;
        if attempted == 0 {
            return 1.0;
        }
        self.processed as f64 / attempted as f64
    }

    /// Returns the reason to stop, if the counters exceed the policy.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn check(&self, policy: &FailurePolicy) -> Option<AbortReason> {
        if self.consecutive_errors > policy.max_consecutive_errors {
            return Some(AbortReason::ConsecutiveErrors {
                streak: self.consecutive_errors,
            });
        }

        let total = self.total_files;
        if total > policy.small_project_files {
            let limit = policy.max_error_ratio * total as f64;
            if self.errors as f64 > limit {
                return Some(AbortReason::ErrorRatio {
                    errors: self.errors,
                    total,
                });
            }
        } else if self.errors > policy.small_project_max_errors {
            return Some(AbortReason::SmallProjectErrors {
                errors: self.errors,
                total,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(total: usize, errors: usize) -> FailureBudget {
        let mut budget = FailureBudget::new(total);
        for i in 0..errors {
            // Interleave successes so the streak rule stays out of the way.
            budget.record_success();
            budget.record_failure(format!("file{i}.rs"));
        }
        budget
    }

    #[test]
    fn test_large_project_ratio() {
        let policy = FailurePolicy::default();
        assert_eq!(
            budget(12, 4).check(&policy),
            Some(AbortReason::ErrorRatio { errors: 4, total: 12 })
        );
        assert_eq!(budget(12, 3).check(&policy), None);
    }

    #[test]
    fn test_small_project_count() {
        let policy = FailurePolicy::default();
        assert_eq!(
            budget(5, 3).check(&policy),
            Some(AbortReason::SmallProjectErrors { errors: 3, total: 5 })
        );
        assert_eq!(budget(5, 2).check(&policy), None);
        assert!(budget(10, 3).check(&policy).is_some());
    }

    #[test]
    fn test_consecutive_streak() {
        let policy = FailurePolicy::default();
        let mut budget = FailureBudget::new(1000);
        for i in 0..5 {
            budget.record_failure(format!("f{i}"));
        }
        assert_eq!(budget.check(&policy), None);

        budget.record_failure("f5");
        assert_eq!(
            budget.check(&policy),
            Some(AbortReason::ConsecutiveErrors { streak: 6 })
        );

        budget.record_success();
        assert_eq!(budget.consecutive_errors, 0);
        assert_eq!(budget.check(&policy), None);
    }

    #[test]
    fn test_counters() {
        let mut budget = FailureBudget::new(4);
        budget.record_success();
        budget.record_failure("b.rs");
        assert!(budget.has_failures());
        assert_eq!(budget.processed, 1);
        assert_eq!(budget.errors, 1);
        assert_eq!(budget.failed_files, vec!["b.rs"]);
        assert!((budget.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_custom_policy() {
        let policy = FailurePolicy {
            max_consecutive_errors: 1,
            ..FailurePolicy::default()
        };
        let mut budget = FailureBudget::new(100);
        budget.record_failure("a");
        assert_eq!(budget.check(&policy), None);
        budget.record_failure("b");
        assert!(matches!(
            budget.check(&policy),
            Some(AbortReason::ConsecutiveErrors { streak: 2 })
        ));
    }

    #[test]
    fn test_reason_display() {
        let reason = AbortReason::ErrorRatio { errors: 4, total: 12 };
        assert_eq!(reason.to_string(), "Aborting: 4 of 12 files failed analysis");
    }
}
