//! JSONL file writer for run events.
//!
//! Every progress callback becomes a single JSON line with a `type` field,
//! a `timestamp` and the run id of the run in flight, appended to the file
//! via a buffered writer.

use mender_application::ports::execution_progress::ExecutionProgressNotifier;
use mender_domain::{
    ErrorCategory, ExecutionResult, Plan, PlanStep, RecoveryAction, StepResult, ToolError,
};
use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

struct Inner {
    writer: BufWriter<File>,
    run_id: Option<String>,
}

/// JSONL run logger that writes one JSON object per event.
///
/// Thread-safe via `Mutex`. Flushes after every line and on `Drop`.
pub struct JsonlRunLogger {
    inner: Mutex<Inner>,
    path: PathBuf,
}

impl JsonlRunLogger {
    /// Create a logger appending to the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create run log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open run log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            inner: Mutex::new(Inner {
                writer: BufWriter::new(file),
                run_id: None,
            }),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn log(&self, event_type: &str, payload: Value) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut record = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        record.insert("type".to_string(), Value::String(event_type.to_string()));
        record.insert("timestamp".to_string(), Value::String(timestamp));
        if let Some(run_id) = &inner.run_id {
            record.insert("run_id".to_string(), Value::String(run_id.clone()));
        }

        let Ok(line) = serde_json::to_string(&Value::Object(record)) else {
            return;
        };
        let _ = writeln!(inner.writer, "{}", line);
        let _ = inner.writer.flush();
    }
}

impl ExecutionProgressNotifier for JsonlRunLogger {
    fn on_run_start(&self, run_id: &str, plan: &Plan, agent: Option<&str>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.run_id = Some(run_id.to_string());
        }
        self.log(
            "run_start",
            json!({
                "workflow": plan.name,
                "version": plan.version,
                "steps": plan.steps.len(),
                "agent": agent,
            }),
        );
    }

    fn on_step_start(&self, step: &PlanStep, attempt: u32) {
        self.log(
            "step_start",
            json!({"step": step.id, "tool": step.tool, "attempt": attempt}),
        );
    }

    fn on_step_skipped(&self, step: &PlanStep) {
        self.log(
            "step_skipped",
            json!({"step": step.id, "condition": step.condition}),
        );
    }

    fn on_attempt_failed(
        &self,
        step: &PlanStep,
        attempt: u32,
        error: &ToolError,
        category: ErrorCategory,
    ) {
        self.log(
            "attempt_failed",
            json!({
                "step": step.id,
                "attempt": attempt,
                "kind": error.kind,
                "error": error.message,
                "category": category.as_str(),
            }),
        );
    }

    fn on_recovery(
        &self,
        step: &PlanStep,
        category: ErrorCategory,
        action: &RecoveryAction,
        attempt: u32,
    ) {
        self.log(
            "recovery",
            json!({
                "step": step.id,
                "category": category.as_str(),
                "action": action.as_str(),
                "attempt": attempt,
            }),
        );
    }

    fn on_fallback_suggested(&self, step: &PlanStep, tool: Option<&str>) {
        self.log(
            "fallback_suggested",
            json!({"step": step.id, "fallback_tool": tool}),
        );
    }

    fn on_step_complete(&self, result: &StepResult) {
        self.log(
            "step_complete",
            serde_json::to_value(result).unwrap_or(Value::Null),
        );
    }

    fn on_run_complete(&self, result: &ExecutionResult) {
        self.log(
            "run_complete",
            json!({
                "workflow": result.workflow_name,
                "status": result.status.as_str(),
                "error": result.error,
                "steps": result.step_results.len(),
                "total_duration_ms": result.total_duration_ms,
                "total_cost_usd": result.total_cost_usd,
                "total_tokens": result.total_tokens,
                "total_retries": result.total_retries,
            }),
        );
        if let Ok(mut inner) = self.inner.lock() {
            inner.run_id = None;
        }
    }
}

impl Drop for JsonlRunLogger {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.lock() {
            let _ = inner.writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_domain::StepStatus;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_run_events_are_written_as_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("events.jsonl");
        let logger = JsonlRunLogger::new(&path).unwrap();

        let plan = Plan::new("deploy").with_step(PlanStep::new("build", "echo"));
        let step = &plan.steps[0];
        logger.on_run_start("run-1", &plan, Some("ops"));
        logger.on_step_start(step, 1);
        logger.on_attempt_failed(
            step,
            1,
            &ToolError::new("ConnectionError", "refused"),
            ErrorCategory::Network,
        );
        logger.on_step_complete(&StepResult::new("build", "echo", StepStatus::Success));
        drop(logger);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 4);
        assert!(lines.iter().all(|l| l["run_id"] == "run-1"));
        assert!(lines.iter().all(|l| l.get("timestamp").is_some()));

        assert_eq!(lines[0]["type"], "run_start");
        assert_eq!(lines[0]["agent"], "ops");
        assert_eq!(lines[2]["type"], "attempt_failed");
        assert_eq!(lines[2]["category"], "network");
        assert_eq!(lines[3]["type"], "step_complete");
        assert_eq!(lines[3]["step_id"], "build");
        assert_eq!(lines[3]["status"], "success");
    }

    #[test]
    fn test_logger_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");

        for _ in 0..2 {
            let logger = JsonlRunLogger::new(&path).unwrap();
            logger.on_step_skipped(&PlanStep::new("s", "echo").with_condition("false"));
        }

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["condition"], "false");
        assert!(lines[1].get("run_id").is_none());
    }
}
