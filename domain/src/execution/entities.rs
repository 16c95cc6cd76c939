//! Execution records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::recovery::category::ErrorCategory;
use crate::tool::value_objects::Usage;

/// Status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    /// Failed, but its `on_error = skip` let the run continue
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Success => "success",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recovery action taken for a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    /// Failed attempt the action responded to (1-based)
    pub attempt: u32,
    pub category: ErrorCategory,
    pub action: String,
    pub error: String,
}

/// Outcome of one executed step. Append-only once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub tool_name: String,
    pub status: StepStatus,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    /// Classified category of the final error
    pub error_type: Option<ErrorCategory>,
    pub duration_ms: u64,
    pub retries: u32,
    pub cost_usd: f64,
    pub tokens_used: u64,
    pub timestamp: DateTime<Utc>,
    /// Alternative tool suggested by a fallback strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recovery: Vec<RecoveryRecord>,
}

impl StepResult {
    pub fn new(
        step_id: impl Into<String>,
        tool_name: impl Into<String>,
        status: StepStatus,
    ) -> Self {
        Self {
            step_id: step_id.into(),
            tool_name: tool_name.into(),
            status,
            output: None,
            error: None,
            error_type: None,
            duration_ms: 0,
            retries: 0,
            cost_usd: 0.0,
            tokens_used: 0,
            timestamp: Utc::now(),
            fallback_tool: None,
            recovery: Vec::new(),
        }
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>, category: ErrorCategory) -> Self {
        self.error = Some(message.into());
        self.error_type = Some(category);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.cost_usd = usage.cost_usd;
        self.tokens_used = usage.tokens;
        self
    }

    pub fn with_fallback_tool(mut self, tool: impl Into<String>) -> Self {
        self.fallback_tool = Some(tool.into());
        self
    }

    pub fn with_recovery(mut self, recovery: Vec<RecoveryRecord>) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result payload of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub workflow_name: String,
    pub status: ExecutionStatus,
    pub step_results: Vec<StepResult>,
    pub output: Option<serde_json::Value>,
    /// Unrecoverable run-level condition
    pub error: Option<String>,
    pub total_duration_ms: u64,
    pub total_cost_usd: f64,
    pub total_tokens: u64,
    pub total_retries: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Run id
    pub trace_id: String,
    /// Profile the run executed under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    pub fn step(&self, step_id: &str) -> Option<&StepResult> {
        self.step_results.iter().find(|r| r.step_id == step_id)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &StepResult> {
        self.step_results
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
    }
}
