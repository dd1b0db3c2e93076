//! The step contract: one idempotent configuration concern.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StepResult;

/// One idempotent configuration concern.
///
/// `probe` is a read-only check of whether the desired state already holds;
/// `apply` is the mutation taken when it does not. The engine never calls
/// `apply` unless the most recent `probe` returned false.
///
/// A probe whose underlying query fails to execute meaningfully must answer
/// `false` ("not yet satisfied"), never escalate: read-only checks have no
/// failure mode worth aborting a run for.
#[async_trait]
pub trait Step: Send + Sync {
    /// Human-readable step name, shown in progress lines and the summary.
    fn name(&self) -> &str;

    /// Whether the desired state already holds.
    async fn probe(&self) -> bool;

    /// Mutate the system toward the desired state.
    async fn apply(&self) -> StepResult;
}

/// Terminal state of a step within one engine run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The probe was false and the mutation completed.
    Applied,

    /// The probe was true; nothing was done.
    Skipped,

    /// The mutation returned an error.
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Applied => "applied",
            StepStatus::Skipped => "skipped",
            StepStatus::Failed => "failed",
        }
    }
}

/// Outcome of one step, produced exactly once per step per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step name.
    pub name: String,

    /// Terminal status.
    pub status: StepStatus,

    /// One-line human message; the error's display text for failures.
    pub message: String,
}

impl StepOutcome {
    pub fn applied(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Applied,
            message: format!("{name} applied"),
        }
    }

    pub fn skipped(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Skipped,
            message: format!("{name} already satisfied"),
        }
    }

    pub fn failed(name: &str, error: impl std::fmt::Display) -> Self {
        Self {
            name: name.to_string(),
            status: StepStatus::Failed,
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_as_str() {
        assert_eq!(StepStatus::Applied.as_str(), "applied");
        assert_eq!(StepStatus::Skipped.as_str(), "skipped");
        assert_eq!(StepStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn failed_outcome_carries_error_text() {
        let outcome = StepOutcome::failed("Hostname", "command `scutil` failed: denied");
        assert_eq!(outcome.status, StepStatus::Failed);
        assert!(outcome.message.contains("denied"));
    }

    #[test]
    fn outcome_serializes_with_snake_case_status() {
        let outcome = StepOutcome::skipped("Homebrew");
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"skipped\""));
        assert!(json.contains("Homebrew"));
    }
}
