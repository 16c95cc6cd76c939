//! Type definitions for the ExecutePlan use case.

use mender_domain::{DomainError, StepResult};
use thiserror::Error;

/// Run-level conditions that end a run early.
///
/// Never returned to callers: the use case turns them into
/// `ExecutionResult.error`.
#[derive(Error, Debug)]
pub enum ExecutePlanError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("Step '{step_id}' failed: {error}")]
    StepFailed { step_id: String, error: String },
}

impl ExecutePlanError {
    pub(super) fn step_failed(result: &StepResult) -> Self {
        ExecutePlanError::StepFailed {
            step_id: result.step_id.clone(),
            error: result
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string()),
        }
    }
}

/// Outcome of one recovery cycle of a step.
pub(super) struct StepRun {
    pub result: StepResult,
    /// Set when the run must stop regardless of the step's `on_error`
    pub abort: Option<ExecutePlanError>,
}

impl StepRun {
    pub fn finished(result: StepResult) -> Self {
        Self {
            result,
            abort: None,
        }
    }

    pub fn aborted(result: StepResult, reason: ExecutePlanError) -> Self {
        Self {
            result,
            abort: Some(reason),
        }
    }
}
