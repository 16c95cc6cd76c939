//! Composite progress notifier: delegates to multiple notifiers.
//!
//! Used by the CLI to fan run events out to the console printer and the
//! JSONL run log at the same time.
//!
//! ```text
//! ExecutePlanUseCase.execute_with_progress(.., &composite)
//!                                               |
//!                    +--------------------------+--------------------+
//!                    |                                               |
//!          ConsoleProgress (cli)                      JsonlRunLogger (infrastructure)
//!          → stderr                                   → <log_dir>/<run_id>.jsonl
//! ```

use super::execution_progress::ExecutionProgressNotifier;
use mender_domain::{
    ErrorCategory, ExecutionResult, Plan, PlanStep, RecoveryAction, StepResult, ToolError,
};

/// A progress notifier that delegates to multiple inner notifiers.
///
/// Holds borrowed references so both owned and borrowed notifiers can be
/// composed without wrapper types.
pub struct CompositeProgressNotifier<'a> {
    delegates: Vec<&'a dyn ExecutionProgressNotifier>,
}

impl<'a> CompositeProgressNotifier<'a> {
    pub fn new(delegates: Vec<&'a dyn ExecutionProgressNotifier>) -> Self {
        Self { delegates }
    }

    pub fn push(&mut self, delegate: &'a dyn ExecutionProgressNotifier) {
        self.delegates.push(delegate);
    }
}

/// Macro to delegate a method call to all inner notifiers.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        for d in &$self.delegates {
            d.$method($($arg),*);
        }
    };
}

impl ExecutionProgressNotifier for CompositeProgressNotifier<'_> {
    fn on_run_start(&self, run_id: &str, plan: &Plan, agent: Option<&str>) {
        delegate!(self, on_run_start, run_id, plan, agent);
    }

    fn on_step_start(&self, step: &PlanStep, attempt: u32) {
        delegate!(self, on_step_start, step, attempt);
    }

    fn on_step_skipped(&self, step: &PlanStep) {
        delegate!(self, on_step_skipped, step);
    }

    fn on_attempt_failed(
        &self,
        step: &PlanStep,
        attempt: u32,
        error: &ToolError,
        category: ErrorCategory,
    ) {
        delegate!(self, on_attempt_failed, step, attempt, error, category);
    }

    fn on_recovery(
        &self,
        step: &PlanStep,
        category: ErrorCategory,
        action: &RecoveryAction,
        attempt: u32,
    ) {
        delegate!(self, on_recovery, step, category, action, attempt);
    }

    fn on_fallback_suggested(&self, step: &PlanStep, tool: Option<&str>) {
        delegate!(self, on_fallback_suggested, step, tool);
    }

    fn on_step_complete(&self, result: &StepResult) {
        delegate!(self, on_step_complete, result);
    }

    fn on_run_complete(&self, result: &ExecutionResult) {
        delegate!(self, on_run_complete, result);
    }
}
