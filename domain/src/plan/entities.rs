//! Plan domain entities

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::recovery::strategy::RecoveryStrategy;
use crate::tool::handler::ToolArgs;

/// Version assigned to plans that do not declare one.
pub const DEFAULT_PLAN_VERSION: &str = "1.0.0";

/// What happens to the run once a step's recovery gave up.
///
/// Serialized as a plain string: `abort`, `skip`, `retry` or `fallback:<tool>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OnError {
    /// Stop the run; remaining steps never execute
    #[default]
    Abort,
    /// Record the step as skipped and continue with the next one
    Skip,
    /// Grant the step one more full recovery cycle, then abort
    Retry,
    /// Invoke the named tool once with the same inputs
    Fallback(String),
}

impl OnError {
    pub fn fallback_tool(&self) -> Option<&str> {
        match self {
            OnError::Fallback(tool) => Some(tool),
            _ => None,
        }
    }
}

impl std::fmt::Display for OnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OnError::Abort => write!(f, "abort"),
            OnError::Skip => write!(f, "skip"),
            OnError::Retry => write!(f, "retry"),
            OnError::Fallback(tool) => write!(f, "fallback:{}", tool),
        }
    }
}

impl std::str::FromStr for OnError {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some((keyword, tool)) = trimmed.split_once(':') {
            let tool = tool.trim();
            return match keyword.trim().to_lowercase().as_str() {
                "fallback" if !tool.is_empty() => Ok(OnError::Fallback(tool.to_string())),
                "fallback" => Err("fallback requires a tool name (fallback:<tool>)".to_string()),
                _ => Err(format!("unknown on_error policy '{}'", s)),
            };
        }
        match trimmed.to_lowercase().as_str() {
            "abort" | "" => Ok(OnError::Abort),
            "skip" | "continue" => Ok(OnError::Skip),
            "retry" => Ok(OnError::Retry),
            _ => Err(format!("unknown on_error policy '{}'", s)),
        }
    }
}

impl TryFrom<String> for OnError {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OnError> for String {
    fn from(value: OnError) -> Self {
        value.to_string()
    }
}

/// Declared caller input of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

fn default_input_type() -> String {
    "string".to_string()
}

fn default_required() -> bool {
    true
}

impl InputSpec {
    pub fn new(input_type: impl Into<String>) -> Self {
        Self {
            input_type: input_type.into(),
            description: String::new(),
            required: true,
            default: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// One node of a plan: a tool bound to inputs and an error policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique within the plan
    pub id: String,
    /// Target tool name
    pub tool: String,
    #[serde(default)]
    pub description: String,
    /// Literal values or `$`-references, resolved right before invocation
    #[serde(default)]
    pub inputs: ToolArgs,
    /// Argument name → reference; overrides `inputs` entries of the same name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_mappings: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub on_error: OnError,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<f64>,
}

impl PlanStep {
    pub fn new(id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            description: String::new(),
            inputs: ToolArgs::new(),
            input_mappings: BTreeMap::new(),
            condition: None,
            on_error: OnError::default(),
            max_retries: None,
            timeout_seconds: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }

    pub fn with_mapping(mut self, name: impl Into<String>, reference: impl Into<String>) -> Self {
        self.input_mappings.insert(name.into(), reference.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

/// A declarative workflow: ordered steps plus budgets and recovery rules.
///
/// Field names follow the structured plan document, so a `Plan` serializes
/// straight to (and parses straight from) JSON or TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_plan_version")]
    pub version: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputSpec>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Plan-scoped recovery strategies, consulted before the defaults
    #[serde(default)]
    pub error_handlers: Vec<RecoveryStrategy>,
    /// Wall-clock budget for the whole run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_budget_usd: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub outputs: BTreeMap<String, serde_json::Value>,
}

fn default_plan_version() -> String {
    DEFAULT_PLAN_VERSION.to_string()
}

impl Plan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: default_plan_version(),
            inputs: BTreeMap::new(),
            steps: Vec::new(),
            constraints: Vec::new(),
            error_handlers: Vec::new(),
            timeout_seconds: None,
            cost_budget_usd: None,
            tags: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_step(mut self, step: PlanStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, spec: InputSpec) -> Self {
        self.inputs.insert(name.into(), spec);
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    pub fn with_error_handler(mut self, strategy: RecoveryStrategy) -> Self {
        self.error_handlers.push(strategy);
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_cost_budget(mut self, usd: f64) -> Self {
        self.cost_budget_usd = Some(usd);
        self
    }

    /// Tools targeted by the steps.
    pub fn required_tools(&self) -> BTreeSet<String> {
        self.steps.iter().map(|s| s.tool.clone()).collect()
    }

    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_ids(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_on_error_parse_and_display() {
        assert_eq!("skip".parse::<OnError>(), Ok(OnError::Skip));
        assert_eq!(
            "fallback: read_cache".parse::<OnError>(),
            Ok(OnError::Fallback("read_cache".to_string()))
        );
        assert!("fallback:".parse::<OnError>().is_err());
        assert!("explode".parse::<OnError>().is_err());
        assert_eq!(OnError::Fallback("x".to_string()).to_string(), "fallback:x");
    }

    #[test]
    fn test_required_tools_deduplicates() {
        let plan = Plan::new("deploy")
            .with_step(PlanStep::new("build", "run_command"))
            .with_step(PlanStep::new("notify", "send_slack"))
            .with_step(PlanStep::new("notify_again", "send_slack"));

        let tools: Vec<_> = plan.required_tools().into_iter().collect();
        assert_eq!(tools, vec!["run_command", "send_slack"]);
    }

    #[test]
    fn test_step_defaults_from_document() {
        let step: PlanStep = serde_json::from_value(json!({
            "id": "fetch",
            "tool": "http_get"
        }))
        .unwrap();

        assert_eq!(step.on_error, OnError::Abort);
        assert!(step.inputs.is_empty());
        assert!(step.condition.is_none());
    }

    #[test]
    fn test_input_spec_is_required_unless_stated() {
        let spec: InputSpec = serde_json::from_value(json!({ "type": "number" })).unwrap();
        assert!(spec.required);

        let spec: InputSpec =
            serde_json::from_value(json!({ "required": false, "default": 3 })).unwrap();
        assert!(!spec.required);
        assert_eq!(spec.input_type, "string");
        assert_eq!(spec.default, Some(json!(3)));
    }
}
