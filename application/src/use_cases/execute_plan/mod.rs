//! Execute Plan use case
//!
//! Runs a compiled plan step by step against the tool catalog, healing
//! failures where a recovery strategy applies.
//!
//! | Phase                  | On failure                                  |
//! |------------------------|---------------------------------------------|
//! | 1. Validate plan       | run fails, no step executed                 |
//! | 2. Bind inputs         | run fails on a missing required input       |
//! | 3. Per step: condition | false → step skipped, nothing recorded      |
//! | 4. Per step: attempts  | see [`recovery`]                            |
//! | 5. Per step: on_error  | abort / skip / retry once / fallback tool   |
//!
//! Budget overruns (cost, tokens, wall clock) end the run immediately and
//! bypass both recovery strategies and `on_error`.
//!
//! `execute` never returns an error: every outcome is reported through the
//! [`ExecutionResult`], which carries the reason in `error`.

mod budget;
mod recovery;
#[cfg(test)]
mod testing;
mod types;

pub use types::ExecutePlanError;

use crate::config::ExecutorConfig;
use crate::ports::dependency_installer::{DependencyInstaller, NoInstaller};
use crate::ports::execution_progress::{ExecutionProgressNotifier, NoExecutionProgress};
use crate::ports::tool_catalog::ToolCatalogPort;
use budget::RunBudget;
use mender_domain::plan::Condition;
use mender_domain::{
    AgentProfile, DefaultToolValidator, DomainError, ErrorClassifier, ExecutionContext,
    ExecutionResult, OnError, Plan, PlanStep, StepResult, StepStatus, StrategyTable, ToolArgs,
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use types::StepRun;

/// Use case for executing a plan with self-healing
pub struct ExecutePlanUseCase<C: ToolCatalogPort + ?Sized> {
    catalog: Arc<C>,
    installer: Arc<dyn DependencyInstaller>,
    config: ExecutorConfig,
    classifier: ErrorClassifier,
    validator: DefaultToolValidator,
}

impl<C: ToolCatalogPort + ?Sized> Clone for ExecutePlanUseCase<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            installer: self.installer.clone(),
            config: self.config.clone(),
            classifier: self.classifier.clone(),
            validator: DefaultToolValidator,
        }
    }
}

impl<C: ToolCatalogPort + ?Sized> ExecutePlanUseCase<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            installer: Arc::new(NoInstaller),
            config: ExecutorConfig::default(),
            classifier: ErrorClassifier::new(),
            validator: DefaultToolValidator,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_installer(mut self, installer: Arc<dyn DependencyInstaller>) -> Self {
        self.installer = installer;
        self
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute a plan without progress reporting.
    pub async fn execute(
        &self,
        plan: &Plan,
        profile: Option<&AgentProfile>,
        inputs: ToolArgs,
    ) -> ExecutionResult {
        self.execute_with_progress(plan, profile, inputs, &NoExecutionProgress)
            .await
    }

    /// Execute a plan, reporting every step and recovery to `progress`.
    pub async fn execute_with_progress(
        &self,
        plan: &Plan,
        profile: Option<&AgentProfile>,
        inputs: ToolArgs,
        progress: &dyn ExecutionProgressNotifier,
    ) -> ExecutionResult {
        let mut ctx = ExecutionContext::new(plan, profile, inputs);
        info!(
            workflow = %plan.name,
            run_id = %ctx.run_id,
            agent = profile.map(|p| p.name.as_str()).unwrap_or("-"),
            steps = plan.steps.len(),
            "Starting run"
        );
        progress.on_run_start(&ctx.run_id, plan, profile.map(|p| p.name.as_str()));

        let error = match self.run(&mut ctx, progress).await {
            Ok(()) => None,
            Err(e) => {
                error!(workflow = %plan.name, run_id = %ctx.run_id, error = %e, "Run failed");
                Some(e.to_string())
            }
        };

        let result = ctx.finish(error);
        info!(
            workflow = %result.workflow_name,
            run_id = %result.trace_id,
            status = %result.status,
            duration_ms = result.total_duration_ms,
            cost_usd = result.total_cost_usd,
            tokens = result.total_tokens,
            retries = result.total_retries,
            "Run finished"
        );
        progress.on_run_complete(&result);
        result
    }

    async fn run(
        &self,
        ctx: &mut ExecutionContext<'_>,
        progress: &dyn ExecutionProgressNotifier,
    ) -> Result<(), ExecutePlanError> {
        let plan = ctx.plan;

        let issues = plan.validate(&self.catalog.tool_names());
        if Plan::has_errors(&issues) {
            return Err(DomainError::InvalidPlan {
                plan: plan.name.clone(),
                issues,
            }
            .into());
        }
        for issue in &issues {
            warn!(workflow = %plan.name, "{}", issue);
        }

        bind_inputs(plan, &mut ctx.inputs)?;

        if let Some(profile) = ctx.profile {
            let missing: Vec<String> = plan
                .required_tools()
                .into_iter()
                .filter(|tool| !profile.has_tool(tool))
                .collect();
            if !missing.is_empty() {
                warn!(
                    agent = %profile.name,
                    missing = ?missing,
                    "Agent profile lacks tools required by the plan"
                );
            }
        }

        let budget = RunBudget::for_run(plan, ctx.profile);
        let strategies = StrategyTable::new(self.config.strategies.clone())
            .with_plan_strategies(&plan.error_handlers);

        for step in &plan.steps {
            if let Some(condition) = &step.condition {
                let condition = Condition::parse(condition)?;
                if !condition.evaluate(&*ctx) {
                    info!(step = %step.id, "Condition false; skipping step");
                    progress.on_step_skipped(step);
                    continue;
                }
            }

            if let Some(reason) = budget.check_deadline() {
                return Err(ExecutePlanError::BudgetExceeded(reason));
            }

            let first = self
                .run_step(ctx, step, &strategies, &budget, progress)
                .await;
            self.settle(ctx, step, first, &strategies, &budget, progress)
                .await?;
        }

        Ok(())
    }

    /// Apply the step's `on_error` policy to a finished recovery cycle and
    /// record the outcome.
    async fn settle(
        &self,
        ctx: &mut ExecutionContext<'_>,
        step: &PlanStep,
        first: StepRun,
        strategies: &StrategyTable,
        budget: &RunBudget,
        progress: &dyn ExecutionProgressNotifier,
    ) -> Result<(), ExecutePlanError> {
        if let Some(reason) = first.abort {
            record(ctx, first.result, progress);
            return Err(reason);
        }
        if first.result.is_success() {
            record(ctx, first.result, progress);
            return Ok(());
        }

        let failed = first.result;
        match &step.on_error {
            OnError::Abort => {
                let err = ExecutePlanError::step_failed(&failed);
                record(ctx, failed, progress);
                Err(err)
            }
            OnError::Skip => {
                info!(step = %step.id, "Step failed; continuing per on_error=skip");
                let mut skipped = failed;
                skipped.status = StepStatus::Skipped;
                record(ctx, skipped, progress);
                Ok(())
            }
            OnError::Retry => {
                info!(step = %step.id, "Step failed; running one more recovery cycle");
                let second = self.run_step(ctx, step, strategies, budget, progress).await;
                let abort = second.abort;
                let merged = merge_cycles(failed, second.result, 1);
                self.conclude(ctx, merged, abort, progress)
            }
            OnError::Fallback(tool) => {
                let second = self.run_fallback(ctx, step, tool, budget).await;
                let abort = second.abort;
                let merged = merge_cycles(failed, second.result, 0);
                self.conclude(ctx, merged, abort, progress)
            }
        }
    }

    fn conclude(
        &self,
        ctx: &mut ExecutionContext<'_>,
        result: StepResult,
        abort: Option<ExecutePlanError>,
        progress: &dyn ExecutionProgressNotifier,
    ) -> Result<(), ExecutePlanError> {
        let err = match abort {
            Some(reason) => Some(reason),
            None if result.is_success() => None,
            None => Some(ExecutePlanError::step_failed(&result)),
        };
        record(ctx, result, progress);
        err.map_or(Ok(()), Err)
    }
}

fn record(
    ctx: &mut ExecutionContext<'_>,
    result: StepResult,
    progress: &dyn ExecutionProgressNotifier,
) {
    debug!(step = %result.step_id, status = %result.status, retries = result.retries, "Recording step result");
    progress.on_step_complete(&result);
    ctx.record(result);
}

/// Fill defaults for absent inputs; fail on a missing required one.
fn bind_inputs(plan: &Plan, inputs: &mut ToolArgs) -> Result<(), DomainError> {
    for (name, spec) in &plan.inputs {
        if inputs.contains_key(name) {
            continue;
        }
        match &spec.default {
            Some(default) => {
                inputs.insert(name.clone(), default.clone());
            }
            None if spec.required => return Err(DomainError::MissingInput(name.clone())),
            None => {}
        }
    }
    Ok(())
}

/// Fold an earlier recovery cycle into the one that followed it.
fn merge_cycles(first: StepResult, mut second: StepResult, extra_retries: u32) -> StepResult {
    second.retries += first.retries + extra_retries;
    second.duration_ms += first.duration_ms;
    second.cost_usd += first.cost_usd;
    second.tokens_used += first.tokens_used;
    let mut recovery = first.recovery;
    recovery.append(&mut second.recovery);
    second.recovery = recovery;
    second
}
