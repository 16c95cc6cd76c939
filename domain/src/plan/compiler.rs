//! Plan source formats and the parse + validate pipeline.

use std::collections::BTreeSet;
use std::path::Path;

use super::entities::Plan;
use super::markdown::parse_markdown;
use super::validation::PlanIssue;
use crate::core::error::DomainError;

/// Source format of a plan document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    /// Structured document as JSON
    Json,
    /// Structured document as TOML
    Toml,
    /// Heading-based document (lossy import)
    Markdown,
}

impl PlanFormat {
    pub fn as_str(&self) -> &str {
        match self {
            PlanFormat::Json => "json",
            PlanFormat::Toml => "toml",
            PlanFormat::Markdown => "markdown",
        }
    }

    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "json" => Some(PlanFormat::Json),
            "toml" => Some(PlanFormat::Toml),
            "md" | "markdown" => Some(PlanFormat::Markdown),
            _ => None,
        }
    }
}

impl std::fmt::Display for PlanFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PlanFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(PlanFormat::Json),
            "toml" => Ok(PlanFormat::Toml),
            "md" | "markdown" => Ok(PlanFormat::Markdown),
            _ => Err(format!("unknown plan format '{}'", s)),
        }
    }
}

impl Plan {
    pub fn from_json(text: &str) -> Result<Self, DomainError> {
        serde_json::from_str(text).map_err(|e| DomainError::parse("json", e))
    }

    pub fn from_toml(text: &str) -> Result<Self, DomainError> {
        toml::from_str(text).map_err(|e| DomainError::parse("toml", e))
    }

    /// Emit the structured document form.
    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string_pretty(self).map_err(|e| DomainError::Serialize(e.to_string()))
    }
}

/// Parse a plan without validating it.
pub fn parse_plan(text: &str, format: PlanFormat) -> Result<Plan, DomainError> {
    match format {
        PlanFormat::Json => Plan::from_json(text),
        PlanFormat::Toml => Plan::from_toml(text),
        PlanFormat::Markdown => parse_markdown(text),
    }
}

/// Parse and validate a plan.
///
/// Succeeds with the plan and its warnings; any error-severity issue turns
/// into [`DomainError::InvalidPlan`].
pub fn compile(
    text: &str,
    format: PlanFormat,
    available_tools: &BTreeSet<String>,
) -> Result<(Plan, Vec<PlanIssue>), DomainError> {
    let plan = parse_plan(text, format)?;
    let issues = plan.validate(available_tools);
    if Plan::has_errors(&issues) {
        return Err(DomainError::InvalidPlan {
            plan: plan.name,
            issues,
        });
    }
    Ok((plan, issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::entities::{OnError, PlanStep};
    use crate::recovery::{ErrorCategory, RecoveryAction};

    const JSON_PLAN: &str = r##"{
        "name": "nightly_report",
        "description": "Collect metrics and post them",
        "inputs": { "channel": { "type": "string", "default": "#ops" } },
        "steps": [
            { "id": "collect", "tool": "fetch_metrics", "inputs": { "window": "24h" }, "max_retries": 5 },
            { "id": "post", "tool": "send_slack",
              "inputs": { "channel": "$inputs.channel" },
              "input_mappings": { "text": "$collect.summary" },
              "condition": "$collect.status == 'ok'",
              "on_error": "skip",
              "timeout_seconds": 10 }
        ],
        "constraints": ["read-only"],
        "error_handlers": [
            { "error_type": "rate_limit", "action": "retry_with_backoff", "max_attempts": 2,
              "backoff_seconds": 0.5, "backoff_multiplier": 3.0 }
        ],
        "timeout_seconds": 120,
        "cost_budget_usd": 0.25,
        "tags": ["reporting"]
    }"##;

    fn tools() -> BTreeSet<String> {
        ["fetch_metrics", "send_slack"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_structured_json() {
        let plan = parse_plan(JSON_PLAN, PlanFormat::Json).unwrap();

        assert_eq!(plan.version, "1.0.0");
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].max_retries, Some(5));
        assert_eq!(plan.steps[1].on_error, OnError::Skip);
        assert_eq!(plan.steps[1].timeout_seconds, Some(10.0));
        assert_eq!(plan.error_handlers[0].category, ErrorCategory::RateLimit);
        assert_eq!(
            plan.error_handlers[0].action,
            RecoveryAction::RetryWithBackoff {
                base_seconds: 0.5,
                multiplier: 3.0
            }
        );
        assert_eq!(plan.cost_budget_usd, Some(0.25));
    }

    #[test]
    fn test_json_round_trip_is_equal() {
        let plan = parse_plan(JSON_PLAN, PlanFormat::Json).unwrap();
        let reparsed = Plan::from_json(&plan.to_json().unwrap()).unwrap();
        assert_eq!(plan, reparsed);
    }

    #[test]
    fn test_parse_toml() {
        let text = r#"
name = "cleanup"
timeout_seconds = 60.0

[[steps]]
id = "list"
tool = "fetch_metrics"

[[steps]]
id = "purge"
tool = "send_slack"
on_error = "fallback:fetch_metrics"
inputs = { items = "$list.items" }

[[error_handlers]]
error_type = "network"
action = "retry"
max_attempts = 4
"#;
        let plan = parse_plan(text, PlanFormat::Toml).unwrap();
        assert_eq!(plan.step_ids(), vec!["list", "purge"]);
        assert_eq!(
            plan.steps[1].on_error,
            OnError::Fallback("fetch_metrics".to_string())
        );
        assert_eq!(plan.error_handlers[0].max_attempts, 4);
    }

    #[test]
    fn test_compile_rejects_error_issues() {
        let plan = Plan::new("bad").with_step(PlanStep::new("a", "warp_drive"));
        let text = plan.to_json().unwrap();

        let result = compile(&text, PlanFormat::Json, &tools());
        assert!(matches!(result, Err(DomainError::InvalidPlan { .. })));
    }

    #[test]
    fn test_compile_returns_warnings() {
        let text = r#"{ "name": "empty", "steps": [] }"#;
        let (plan, warnings) = compile(text, PlanFormat::Json, &tools()).unwrap();
        assert_eq!(plan.name, "empty");
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(PlanFormat::from_path(Path::new("a/b.JSON")), Some(PlanFormat::Json));
        assert_eq!(PlanFormat::from_path(Path::new("plan.md")), Some(PlanFormat::Markdown));
        assert_eq!(PlanFormat::from_path(Path::new("plan.yaml")), None);
        assert_eq!("toml".parse::<PlanFormat>(), Ok(PlanFormat::Toml));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let result = parse_plan("{ not json", PlanFormat::Json);
        assert!(matches!(result, Err(DomainError::PlanParse { format, .. }) if format == "json"));
    }
}
