//! Console progress for plan runs
//!
//! Printed to stderr so `--output json` keeps stdout machine-readable.

use colored::Colorize;
use mender_application::ExecutionProgressNotifier;
use mender_domain::{
    ErrorCategory, ExecutionResult, Plan, PlanStep, RecoveryAction, StepResult, StepStatus,
    ToolError,
};

/// Simple line-based progress
pub struct ConsoleProgress;

impl ExecutionProgressNotifier for ConsoleProgress {
    fn on_run_start(&self, run_id: &str, plan: &Plan, agent: Option<&str>) {
        eprintln!(
            "{} {} ({} steps, run {})",
            "->".cyan(),
            plan.name.bold(),
            plan.steps.len(),
            run_id
        );
        if let Some(agent) = agent {
            eprintln!("   agent: {}", agent.cyan());
        }
    }

    fn on_step_start(&self, step: &PlanStep, attempt: u32) {
        if attempt == 1 {
            eprintln!("  {} {} [{}]", "*".cyan(), step.id.bold(), step.tool);
        } else {
            eprintln!("    attempt {}", attempt);
        }
    }

    fn on_step_skipped(&self, step: &PlanStep) {
        eprintln!(
            "  {} {} (condition false)",
            "-".dimmed(),
            step.id.dimmed()
        );
    }

    fn on_attempt_failed(
        &self,
        _step: &PlanStep,
        attempt: u32,
        error: &ToolError,
        category: ErrorCategory,
    ) {
        eprintln!(
            "    {} attempt {} failed [{}]: {}",
            "!".yellow(),
            attempt,
            category.as_str().yellow(),
            error.message
        );
    }

    fn on_recovery(
        &self,
        _step: &PlanStep,
        _category: ErrorCategory,
        action: &RecoveryAction,
        _attempt: u32,
    ) {
        eprintln!("    {} {}", "~".cyan(), action.as_str().cyan());
    }

    fn on_fallback_suggested(&self, _step: &PlanStep, tool: Option<&str>) {
        match tool {
            Some(tool) => eprintln!("    {} consider fallback tool '{}'", "?".yellow(), tool),
            None => eprintln!("    {} no fallback tool configured", "?".yellow()),
        }
    }

    fn on_step_complete(&self, result: &StepResult) {
        let mark = match result.status {
            StepStatus::Success => "v".green(),
            StepStatus::Skipped => "-".yellow(),
            _ => "x".red(),
        };
        let retries = if result.retries > 0 {
            format!(", {} retries", result.retries)
        } else {
            String::new()
        };
        eprintln!(
            "  {} {} {} ({} ms{})",
            mark, result.step_id, result.status, result.duration_ms, retries
        );
    }

    fn on_run_complete(&self, _result: &ExecutionResult) {
        eprintln!();
    }
}
