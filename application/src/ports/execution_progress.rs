//! Execution progress port.
//!
//! [`ExecutionProgressNotifier`] is an **output port** for observing a run:
//! the CLI prints from it and the JSONL run logger persists it. All callback
//! argument types come from the domain layer.
//!
//! # Callback Categories
//!
//! - **Run callbacks**: start and completion of a run
//! - **Step callbacks**: start, condition skip and completion of a step
//! - **Recovery callbacks**: failed attempts, applied recovery actions and
//!   fallback suggestions
//!
//! All methods have default no-op implementations, so implementers only
//! need to override the callbacks they care about.

use mender_domain::{
    ErrorCategory, ExecutionResult, Plan, PlanStep, RecoveryAction, StepResult, ToolError,
};

/// Progress notifier for plan execution.
pub trait ExecutionProgressNotifier: Send + Sync {
    /// Called once before the first step
    fn on_run_start(&self, _run_id: &str, _plan: &Plan, _agent: Option<&str>) {}

    /// Called before every attempt of a step (attempt is 1-based)
    fn on_step_start(&self, _step: &PlanStep, _attempt: u32) {}

    /// Called when a step's condition evaluated to false
    fn on_step_skipped(&self, _step: &PlanStep) {}

    /// Called when an attempt failed, after classification
    fn on_attempt_failed(
        &self,
        _step: &PlanStep,
        _attempt: u32,
        _error: &ToolError,
        _category: ErrorCategory,
    ) {
    }

    /// Called when a recovery action is applied
    fn on_recovery(
        &self,
        _step: &PlanStep,
        _category: ErrorCategory,
        _action: &RecoveryAction,
        _attempt: u32,
    ) {
    }

    /// Called when a fallback strategy surfaces an alternative tool
    fn on_fallback_suggested(&self, _step: &PlanStep, _tool: Option<&str>) {}

    /// Called when a step result is recorded
    fn on_step_complete(&self, _result: &StepResult) {}

    /// Called once with the final result
    fn on_run_complete(&self, _result: &ExecutionResult) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoExecutionProgress;

impl ExecutionProgressNotifier for NoExecutionProgress {}
