//! Per-run mutable state.
//!
//! An [`ExecutionContext`] is created at the start of a run, threaded
//! through every step and consumed into an [`ExecutionResult`]. It is owned
//! by exactly one run and is not synchronized.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::entities::{ExecutionResult, ExecutionStatus, StepResult, StepStatus};
use crate::agent::entities::AgentProfile;
use crate::plan::entities::Plan;
use crate::plan::reference::ReferenceScope;
use crate::tool::handler::ToolArgs;
use crate::tool::value_objects::Usage;

/// Variable holding the run id.
pub const RUN_ID_VARIABLE: &str = "run_id";
/// Variable holding the plan name.
pub const WORKFLOW_NAME_VARIABLE: &str = "workflow_name";

#[derive(Debug)]
pub struct ExecutionContext<'a> {
    pub plan: &'a Plan,
    pub profile: Option<&'a AgentProfile>,
    pub inputs: ToolArgs,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    results: Vec<StepResult>,
    by_step: HashMap<String, usize>,
    variables: HashMap<String, Value>,
    usage: Usage,
    clock: Instant,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(plan: &'a Plan, profile: Option<&'a AgentProfile>, inputs: ToolArgs) -> Self {
        let run_id = uuid::Uuid::new_v4().to_string();
        let variables = HashMap::from([
            (RUN_ID_VARIABLE.to_string(), Value::String(run_id.clone())),
            (
                WORKFLOW_NAME_VARIABLE.to_string(),
                Value::String(plan.name.clone()),
            ),
        ]);
        Self {
            plan,
            profile,
            inputs,
            run_id,
            started_at: Utc::now(),
            results: Vec::new(),
            by_step: HashMap::new(),
            variables,
            usage: Usage::default(),
            clock: Instant::now(),
        }
    }

    /// Append a step result and publish `<step_id>_status`.
    pub fn record(&mut self, result: StepResult) {
        self.variables.insert(
            format!("{}_status", result.step_id),
            Value::String(result.status.as_str().to_string()),
        );
        self.by_step
            .insert(result.step_id.clone(), self.results.len());
        self.results.push(result);
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn results(&self) -> &[StepResult] {
        &self.results
    }

    pub fn result(&self, step_id: &str) -> Option<&StepResult> {
        self.by_step.get(step_id).map(|&i| &self.results[i])
    }

    pub fn add_usage(&mut self, usage: Usage) {
        self.usage.add(usage);
    }

    /// Running cost and token totals across all attempts so far.
    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    pub fn total_retries(&self) -> u32 {
        self.results.iter().map(|r| r.retries).sum()
    }

    /// Consume the context into the run's result.
    ///
    /// The run succeeds only when there is no run-level error and no
    /// recorded step failed.
    pub fn finish(self, error: Option<String>) -> ExecutionResult {
        let failed = self.results.iter().any(|r| r.status == StepStatus::Failed);
        let status = if error.is_none() && !failed {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        ExecutionResult {
            workflow_name: self.plan.name.clone(),
            status,
            output: self.results.last().and_then(|r| r.output.clone()),
            error,
            total_duration_ms: self.clock.elapsed().as_millis() as u64,
            total_cost_usd: self.usage.cost_usd,
            total_tokens: self.usage.tokens,
            total_retries: self.total_retries(),
            started_at: self.started_at,
            completed_at: Utc::now(),
            trace_id: self.run_id,
            agent: self.profile.map(|p| p.name.clone()),
            step_results: self.results,
        }
    }
}

impl ReferenceScope for ExecutionContext<'_> {
    fn previous_output(&self) -> Option<&Value> {
        self.results.last()?.output.as_ref()
    }

    fn inputs(&self) -> &ToolArgs {
        &self.inputs
    }

    fn step_output(&self, step_id: &str) -> Option<&Value> {
        self.result(step_id)?.output.as_ref()
    }

    fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}
