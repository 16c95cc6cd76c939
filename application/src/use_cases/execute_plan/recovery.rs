//! The per-step attempt loop.
//!
//! ```text
//! ┌─────────┐  ok   ┌─────────┐
//! │ attempt │──────▶│ success │
//! └────┬────┘       └─────────┘
//!      │ err
//!      ▼
//! classify ─▶ lookup strategy ─┬─ none / exhausted ───────────▶ failed
//!      ▲                       ├─ fallback/alert/escalate/skip/abort ─▶ failed (+ action)
//!      │                       └─ retry / backoff / refresh_auth /
//!      └──────────────────────────  increase_timeout / install_dependency
//! ```
//!
//! Usage of every attempt is added to the run totals before anything else,
//! so a budget overrun stops the step even when a strategy would retry.

use super::ExecutePlanUseCase;
use super::budget::RunBudget;
use super::types::{ExecutePlanError, StepRun};
use crate::ports::execution_progress::ExecutionProgressNotifier;
use crate::ports::tool_catalog::ToolCatalogPort;
use mender_domain::plan::resolve_value;
use mender_domain::recovery::extract_missing_module;
use mender_domain::tool::apply_input_defaults;
use mender_domain::{
    AlertSeverity, ErrorCategory, ExecutionContext, PlanStep, RecoveryAction, RecoveryRecord,
    StepResult, StepStatus, StrategyTable, Tool, ToolArgs, ToolError, ToolResponse, ToolValidator,
    Usage, saturating_duration,
};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

impl<C: ToolCatalogPort + ?Sized> ExecutePlanUseCase<C> {
    /// Run one full recovery cycle of a step.
    pub(super) async fn run_step(
        &self,
        ctx: &mut ExecutionContext<'_>,
        step: &PlanStep,
        strategies: &StrategyTable,
        budget: &RunBudget,
        progress: &dyn ExecutionProgressNotifier,
    ) -> StepRun {
        let tool = self.catalog.tool(&step.tool);
        let max_retries = step
            .max_retries
            .or_else(|| tool.as_ref().and_then(|t| t.definition.max_retries))
            .unwrap_or(self.config.max_retries);
        let mut timeout = self.step_timeout(step, tool.as_ref());

        let started = Instant::now();
        let mut usage = Usage::default();
        let mut recovery: Vec<RecoveryRecord> = Vec::new();
        let mut attempt: u32 = 0;

        let finish = |status: StepStatus, usage: Usage, retries: u32, recovery: Vec<RecoveryRecord>| {
            StepResult::new(&step.id, &step.tool, status)
                .with_duration(started.elapsed())
                .with_retries(retries)
                .with_usage(usage)
                .with_recovery(recovery)
        };

        loop {
            attempt += 1;
            let retries = attempt - 1;

            if let Some(reason) = budget.check_deadline() {
                error!(step = %step.id, run_id = %ctx.run_id, %reason, "Wall-clock budget exceeded");
                let result = finish(StepStatus::Failed, usage, retries, recovery)
                    .with_error(reason.clone(), ErrorCategory::BudgetExceeded);
                return StepRun::aborted(result, ExecutePlanError::BudgetExceeded(reason));
            }

            progress.on_step_start(step, attempt);
            debug!(step = %step.id, tool = %step.tool, attempt, timeout_ms = timeout.as_millis() as u64, "Invoking tool");

            let outcome = self
                .invoke(step, &step.tool, tool.as_ref(), ctx, budget.cap_timeout(timeout))
                .await;
            let attempt_usage = match &outcome {
                Ok(response) => response.usage,
                Err(error) => error.usage,
            };
            usage.add(attempt_usage);
            ctx.add_usage(attempt_usage);
            let over_budget = budget.check_usage(ctx.usage());

            let error = match outcome {
                Ok(response) => {
                    debug!(step = %step.id, attempt, "Step succeeded");
                    let result = finish(StepStatus::Success, usage, retries, recovery)
                        .with_output(response.output);
                    return match over_budget {
                        Some(reason) => {
                            error!(step = %step.id, run_id = %ctx.run_id, %reason, "Budget exceeded");
                            StepRun::aborted(result, ExecutePlanError::BudgetExceeded(reason))
                        }
                        None => StepRun::finished(result),
                    };
                }
                Err(error) => error,
            };

            if let Some(reason) = over_budget {
                error!(step = %step.id, run_id = %ctx.run_id, %reason, "Budget exceeded");
                let result = finish(StepStatus::Failed, usage, retries, recovery)
                    .with_error(reason.clone(), ErrorCategory::BudgetExceeded);
                return StepRun::aborted(result, ExecutePlanError::BudgetExceeded(reason));
            }

            let category = self.classifier.classify(&error);
            warn!(
                step = %step.id,
                tool = %step.tool,
                attempt,
                category = %category,
                error = %error,
                "Attempt failed"
            );
            progress.on_attempt_failed(step, attempt, &error, category);

            let failed = |usage: Usage, recovery: Vec<RecoveryRecord>| {
                finish(StepStatus::Failed, usage, retries, recovery)
                    .with_error(error.to_string(), category)
            };

            let Some(strategy) = strategies.lookup(category) else {
                info!(step = %step.id, category = %category, "No recovery strategy; giving up");
                return StepRun::finished(failed(usage, recovery));
            };

            let action = &strategy.action;
            if action.retries() && (strategy.is_exhausted(attempt) || attempt > max_retries) {
                warn!(
                    step = %step.id,
                    category = %category,
                    action = %action,
                    attempts = attempt,
                    "Recovery strategy exhausted"
                );
                return StepRun::finished(failed(usage, recovery));
            }

            recovery.push(RecoveryRecord {
                attempt,
                category,
                action: action.as_str().to_string(),
                error: error.to_string(),
            });
            progress.on_recovery(step, category, action, attempt);

            match action {
                RecoveryAction::Retry => {
                    info!(step = %step.id, category = %category, action = %action, attempt, "Retrying");
                }
                RecoveryAction::RetryWithBackoff { .. } => {
                    let delay = action.backoff_delay(attempt).unwrap_or_default();
                    info!(
                        step = %step.id,
                        category = %category,
                        action = %action,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                RecoveryAction::RefreshAuth => {
                    info!(
                        step = %step.id,
                        category = %category,
                        action = %action,
                        delay_ms = self.config.auth_refresh_delay.as_millis() as u64,
                        "Waiting for credential refresh"
                    );
                    tokio::time::sleep(self.config.auth_refresh_delay).await;
                }
                RecoveryAction::IncreaseTimeout { factor } => {
                    timeout = saturating_duration(timeout.as_secs_f64() * factor.max(1.0));
                    info!(
                        step = %step.id,
                        category = %category,
                        action = %action,
                        timeout_ms = timeout.as_millis() as u64,
                        "Raised attempt timeout"
                    );
                }
                RecoveryAction::InstallDependency => {
                    let Some(module) = extract_missing_module(&error.classification_text()) else {
                        warn!(step = %step.id, category = %category, "No module name in error; cannot install");
                        return StepRun::finished(failed(usage, recovery));
                    };
                    info!(step = %step.id, category = %category, action = %action, module = %module, "Installing missing dependency");
                    if let Err(e) = self.installer.install(&module).await {
                        warn!(step = %step.id, module = %module, error = %e, "Dependency installation failed");
                        return StepRun::finished(failed(usage, recovery));
                    }
                }
                RecoveryAction::Fallback { tool } => {
                    info!(
                        step = %step.id,
                        category = %category,
                        action = %action,
                        fallback = tool.as_deref().unwrap_or("<none>"),
                        "Fallback suggested"
                    );
                    progress.on_fallback_suggested(step, tool.as_deref());
                    let mut result = failed(usage, recovery);
                    if let Some(tool) = tool {
                        result = result.with_fallback_tool(tool);
                    }
                    return StepRun::finished(result);
                }
                RecoveryAction::Alert { severity } => {
                    let message = error.to_string();
                    match severity {
                        AlertSeverity::Info => info!(step = %step.id, category = %category, alert = %message, "Alert raised"),
                        AlertSeverity::Warning => warn!(step = %step.id, category = %category, alert = %message, "Alert raised"),
                        AlertSeverity::Error | AlertSeverity::Critical => {
                            error!(step = %step.id, category = %category, severity = severity.as_str(), alert = %message, "Alert raised")
                        }
                    }
                    return StepRun::finished(failed(usage, recovery));
                }
                RecoveryAction::Escalate => {
                    warn!(step = %step.id, category = %category, action = %action, "Escalating to an operator");
                    return StepRun::finished(failed(usage, recovery));
                }
                RecoveryAction::Skip | RecoveryAction::Abort => {
                    info!(step = %step.id, category = %category, action = %action, "Stopping recovery");
                    return StepRun::finished(failed(usage, recovery));
                }
            }
        }
    }

    /// Invoke `tool_name` once with the step's resolved inputs.
    pub(super) async fn run_fallback(
        &self,
        ctx: &mut ExecutionContext<'_>,
        step: &PlanStep,
        tool_name: &str,
        budget: &RunBudget,
    ) -> StepRun {
        let started = Instant::now();
        let tool = self.catalog.tool(tool_name);
        let timeout = budget.cap_timeout(self.step_timeout(step, tool.as_ref()));
        info!(step = %step.id, fallback = tool_name, "Invoking fallback tool");

        let outcome = self.invoke(step, tool_name, tool.as_ref(), ctx, timeout).await;
        let usage = match &outcome {
            Ok(response) => response.usage,
            Err(error) => error.usage,
        };
        ctx.add_usage(usage);

        let base = |status| {
            StepResult::new(&step.id, tool_name, status)
                .with_duration(started.elapsed())
                .with_usage(usage)
                .with_fallback_tool(tool_name)
        };
        let result = match outcome {
            Ok(response) => base(StepStatus::Success).with_output(response.output),
            Err(error) => {
                let category = self.classifier.classify(&error);
                base(StepStatus::Failed).with_error(error.to_string(), category)
            }
        };

        match budget.check_usage(ctx.usage()) {
            Some(reason) => StepRun::aborted(result, ExecutePlanError::BudgetExceeded(reason)),
            None => StepRun::finished(result),
        }
    }

    fn step_timeout(&self, step: &PlanStep, tool: Option<&Tool>) -> Duration {
        step.timeout_seconds
            .or_else(|| tool.and_then(|t| t.definition.timeout_seconds))
            .filter(|s| *s > 0.0)
            .map(saturating_duration)
            .unwrap_or(self.config.default_timeout)
    }

    /// One invocation of `tool_name`: resolve, default, validate, call with a timeout.
    async fn invoke(
        &self,
        step: &PlanStep,
        tool_name: &str,
        tool: Option<&Tool>,
        ctx: &ExecutionContext<'_>,
        timeout: Duration,
    ) -> Result<ToolResponse, ToolError> {
        let tool = tool.ok_or_else(|| ToolError::not_found(tool_name))?;

        let mut args = resolve_args(step, ctx);
        apply_input_defaults(&mut args, &tool.definition);
        self.validator
            .validate(&args, &tool.definition)
            .map_err(ToolError::invalid_argument)?;

        match tokio::time::timeout(timeout, tool.handler.invoke(&args)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolError::timeout(timeout)),
        }
    }
}

/// Static inputs first, then input mappings by the same rule.
pub(super) fn resolve_args(step: &PlanStep, ctx: &ExecutionContext<'_>) -> ToolArgs {
    let mut args: ToolArgs = step
        .inputs
        .iter()
        .map(|(name, value)| (name.clone(), resolve_value(value, ctx)))
        .collect();
    for (name, reference) in &step.input_mappings {
        args.insert(
            name.clone(),
            resolve_value(&Value::String(reference.clone()), ctx),
        );
    }
    args
}
