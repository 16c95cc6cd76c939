//! Heading-based plan importer.
//!
//! A convenience format for hand-written workflows. Parsing is lossy:
//! only names, descriptions, input defaults, step order, target tools and
//! constraints survive.
//!
//! ```text
//! # Workflow: Deploy Service
//!
//! ## Objective
//! Ship the service and tell the team.
//!
//! ## Inputs
//! - Service (string): api
//! - Replicas (number): 3
//!
//! ## Steps
//! 1. **build**: Build the image, use the run_command tool
//! 2. **announce**: Use the `send_slack` tool to post the release
//!
//! ## Constraints
//! - Never deploy on Fridays
//! ```
//!
//! Section headings are matched by keyword, so `## Input Parameters` and
//! `## Execution Steps` work too. Steps without a "use the X tool" phrase
//! target [`UNASSIGNED_TOOL`], which validation reports as unknown.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::entities::{InputSpec, Plan, PlanStep};
use crate::core::error::DomainError;

/// Tool name given to steps whose text names no tool.
pub const UNASSIGNED_TOOL: &str = "unassigned";

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^#\s+(?:workflow\s*:\s*)?(?P<name>.+?)\s*$").expect("title pattern")
});

static INPUT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-*+]\s+(?P<name>[^(:]+?)\s*(?:\((?P<type>[^)]*)\))?\s*(?::\s*(?P<value>.*?))?\s*$")
        .expect("input line pattern")
});

static STEP_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+[.)]|[-*+])\s+(?:\*\*(?P<id>[^*]+)\*\*\s*:?\s*)?(?P<desc>.*?)\s*$")
        .expect("step line pattern")
});

static TOOL_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\buse\s+(?:the\s+)?`?(?P<tool>[A-Za-z0-9_\-]+)`?\s+tool\b").expect("tool phrase pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Objective,
    Inputs,
    Steps,
    Constraints,
    Other,
}

impl Section {
    fn from_heading(heading: &str) -> Self {
        let heading = heading.to_lowercase();
        if heading.contains("objective") || heading.contains("goal") {
            Section::Objective
        } else if heading.contains("input") {
            Section::Inputs
        } else if heading.contains("step") {
            Section::Steps
        } else if heading.contains("constraint") {
            Section::Constraints
        } else {
            Section::Other
        }
    }
}

/// Lowercase snake_case identifier (`"Build Image"` → `build_image`).
pub fn normalize_identifier(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// Parse a heading-based document into a plan.
pub fn parse_markdown(text: &str) -> Result<Plan, DomainError> {
    let mut name: Option<String> = None;
    let mut section = Section::Other;
    let mut objective: Vec<&str> = Vec::new();
    let mut plan = Plan::new(String::new());

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(heading) = line.strip_prefix("## ") {
            section = Section::from_heading(heading);
            continue;
        }
        if line.starts_with("# ") {
            if name.is_none()
                && let Some(caps) = TITLE.captures(line)
            {
                name = Some(normalize_identifier(&caps["name"]));
            }
            continue;
        }

        match section {
            Section::Objective => objective.push(line),
            Section::Inputs => {
                if let Some((input_name, spec)) = parse_input_line(line) {
                    plan.inputs.insert(input_name, spec);
                }
            }
            Section::Steps => {
                if let Some(step) = parse_step_line(line, plan.steps.len() + 1) {
                    plan.steps.push(step);
                }
            }
            Section::Constraints => {
                if let Some(constraint) = strip_bullet(line) {
                    plan.constraints.push(constraint.to_string());
                }
            }
            Section::Other => {}
        }
    }

    plan.name = name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DomainError::parse("markdown", "missing '# Workflow: <name>' title"))?;
    plan.description = objective.join(" ");
    Ok(plan)
}

fn strip_bullet(line: &str) -> Option<&str> {
    line.strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .or_else(|| line.strip_prefix("+ "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_input_line(line: &str) -> Option<(String, InputSpec)> {
    let caps = INPUT_LINE.captures(line)?;
    let name = normalize_identifier(&caps["name"]);
    if name.is_empty() {
        return None;
    }

    let input_type = caps
        .name("type")
        .map(|m| m.as_str().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "string".to_string());
    let mut spec = InputSpec::new(input_type);

    if let Some(value) = caps.name("value").map(|m| m.as_str()).filter(|v| !v.is_empty()) {
        spec = spec.with_default(parse_scalar(value));
    }
    Some((name, spec))
}

/// Numbers and booleans keep their JSON type; everything else is a string.
fn parse_scalar(text: &str) -> Value {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ (Value::Number(_) | Value::Bool(_))) => value,
        _ => Value::String(text.to_string()),
    }
}

fn parse_step_line(line: &str, position: usize) -> Option<PlanStep> {
    let caps = STEP_LINE.captures(line)?;
    let description = caps.name("desc").map(|m| m.as_str()).unwrap_or_default();

    let id = caps
        .name("id")
        .map(|m| normalize_identifier(m.as_str()))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("step_{}", position));

    let tool = TOOL_PHRASE
        .captures(description)
        .map(|c| c["tool"].to_string())
        .unwrap_or_else(|| UNASSIGNED_TOOL.to_string());

    Some(PlanStep::new(id, tool).with_description(description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_patterns_compile() {
        assert!(TITLE.is_match("# Workflow: Deploy"));
        assert!(INPUT_LINE.is_match("- service (string): api"));
        assert!(STEP_LINE.is_match("1. **build**: compile"));
        assert!(TOOL_PHRASE.is_match("use the `deploy` tool"));
    }

    const DOCUMENT: &str = r#"
# Workflow: Deploy Service

## Objective
Ship the service
and tell the team.

## Inputs
- Service Name (string): api
- Replicas (number): 3
- Region

## Steps
1. **Build Image**: Build it, use the run_command tool
2. **announce**: Use the `send_slack` tool to post the release
3. Wait for the dust to settle

## Constraints
- Never deploy on Fridays
"#;

    #[test]
    fn test_parse_full_document() {
        let plan = parse_markdown(DOCUMENT).unwrap();

        assert_eq!(plan.name, "deploy_service");
        assert_eq!(plan.description, "Ship the service and tell the team.");
        assert_eq!(plan.constraints, vec!["Never deploy on Fridays"]);

        assert_eq!(plan.inputs["service_name"].default, Some(json!("api")));
        assert_eq!(plan.inputs["replicas"].input_type, "number");
        assert_eq!(plan.inputs["replicas"].default, Some(json!(3)));
        assert!(plan.inputs["region"].default.is_none());

        let steps: Vec<(&str, &str)> = plan
            .steps
            .iter()
            .map(|s| (s.id.as_str(), s.tool.as_str()))
            .collect();
        assert_eq!(
            steps,
            vec![
                ("build_image", "run_command"),
                ("announce", "send_slack"),
                ("step_3", UNASSIGNED_TOOL),
            ]
        );
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let result = parse_markdown("## Steps\n1. **a**: use the echo tool\n");
        assert!(matches!(result, Err(DomainError::PlanParse { .. })));
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Build -- Image! "), "build_image");
        assert_eq!(normalize_identifier("step2"), "step2");
    }
}
