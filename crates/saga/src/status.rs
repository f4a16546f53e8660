//! Saga and step status state machines.

use serde::{Deserialize, Serialize};

/// The overall status of a saga run.
///
/// Status transitions are monotonic within a run:
/// ```text
/// Idle ──► Running ──┬──► Completed
///                    └──► Compensating ──► Failed
/// ```
/// A run never re-enters `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SagaStatus {
    /// Constructed but not started.
    #[default]
    Idle,

    /// Forward steps are being executed.
    Running,

    /// A step failed and compensating handlers are running in reverse order.
    Compensating,

    /// All steps completed successfully (terminal).
    Completed,

    /// Compensation finished after a failure (terminal).
    Failed,
}

impl SagaStatus {
    /// Returns true if the saga can begin running.
    pub fn can_run(&self) -> bool {
        matches!(self, SagaStatus::Idle)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SagaStatus::Completed | SagaStatus::Failed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Idle => "idle",
            SagaStatus::Running => "running",
            SagaStatus::Compensating => "compensating",
            SagaStatus::Completed => "completed",
            SagaStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The status of one pipeline step.
///
/// Steps start `Pending`, move to `Processing` when their handler is invoked,
/// and end `Completed` or `Failed` on the forward pass. A step whose
/// compensating handler succeeds during rollback reverts to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not yet executed, or successfully rolled back.
    #[default]
    Pending,

    /// Forward handler or compensating handler in flight.
    Processing,

    /// Forward handler succeeded.
    Completed,

    /// Forward handler failed.
    Failed,
}

impl StepStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Processing => "processing",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
