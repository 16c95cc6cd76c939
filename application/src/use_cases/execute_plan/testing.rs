//! Test doubles for the executor.

use crate::ports::execution_progress::ExecutionProgressNotifier;
use crate::ports::tool_catalog::ToolCatalogPort;
use async_trait::async_trait;
use mender_domain::{
    ExecutionResult, PlanStep, StepResult, Tool, ToolArgs, ToolCategory, ToolDefinition,
    ToolError, ToolHandler, ToolResponse,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

enum Behaviour {
    Script(Mutex<VecDeque<Result<ToolResponse, ToolError>>>),
    Always(Value),
    Echo(String),
}

struct Inner {
    behaviour: Behaviour,
    delays: Mutex<VecDeque<Duration>>,
    calls: AtomicU32,
}

/// Tool whose answers are fixed up front.
#[derive(Clone)]
pub struct ScriptedTool {
    inner: Arc<Inner>,
}

impl ScriptedTool {
    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            inner: Arc::new(Inner {
                behaviour,
                delays: Mutex::new(VecDeque::new()),
                calls: AtomicU32::new(0),
            }),
        }
    }

    /// Answers in order; fails once the script runs out.
    pub fn new(script: Vec<Result<ToolResponse, ToolError>>) -> Self {
        Self::with_behaviour(Behaviour::Script(Mutex::new(script.into())))
    }

    pub fn succeeding(output: Value) -> Self {
        Self::with_behaviour(Behaviour::Always(output))
    }

    /// Returns the value of argument `name`.
    pub fn echoing(name: &str) -> Self {
        Self::with_behaviour(Behaviour::Echo(name.to_string()))
    }

    /// Per-call delays, consumed in order.
    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.inner.delays.lock().unwrap() = delays.into();
        self
    }

    pub fn calls(&self) -> u32 {
        self.inner.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolHandler for ScriptedTool {
    async fn invoke(&self, args: &ToolArgs) -> Result<ToolResponse, ToolError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.inner.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match &self.inner.behaviour {
            Behaviour::Script(script) => script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ToolError::execution_failed("script exhausted"))),
            Behaviour::Always(output) => Ok(ToolResponse::new(output.clone())),
            Behaviour::Echo(name) => Ok(ToolResponse::new(
                args.get(name).cloned().unwrap_or(Value::Null),
            )),
        }
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    tools: HashMap<String, Tool>,
    listed: BTreeSet<String>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tool(mut self, name: &str, tool: &ScriptedTool) -> Self {
        let definition = ToolDefinition::new(name, "scripted", ToolCategory::General);
        self.tools
            .insert(name.to_string(), Tool::new(definition, tool.clone()));
        self
    }

    /// Advertise `name` without a tool behind it, like an entry removed
    /// after the plan was validated.
    pub fn with_listed_name(mut self, name: &str) -> Self {
        self.listed.insert(name.to_string());
        self
    }
}

impl ToolCatalogPort for FakeCatalog {
    fn tool(&self, name: &str) -> Option<Tool> {
        self.tools.get(name).cloned()
    }

    fn tool_names(&self) -> BTreeSet<String> {
        self.tools
            .keys()
            .chain(self.listed.iter())
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct RecordingProgress {
    completed: Mutex<Vec<String>>,
    fallbacks: Mutex<Vec<Option<String>>>,
    finished: Mutex<Option<String>>,
}

impl RecordingProgress {
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    pub fn fallbacks(&self) -> Vec<Option<String>> {
        self.fallbacks.lock().unwrap().clone()
    }

    pub fn finished_run(&self) -> Option<String> {
        self.finished.lock().unwrap().clone()
    }
}

impl ExecutionProgressNotifier for RecordingProgress {
    fn on_fallback_suggested(&self, _step: &PlanStep, tool: Option<&str>) {
        self.fallbacks
            .lock()
            .unwrap()
            .push(tool.map(str::to_string));
    }

    fn on_step_complete(&self, result: &StepResult) {
        self.completed.lock().unwrap().push(result.step_id.clone());
    }

    fn on_run_complete(&self, result: &ExecutionResult) {
        *self.finished.lock().unwrap() = Some(result.trace_id.clone());
    }
}
