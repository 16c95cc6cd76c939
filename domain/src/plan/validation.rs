//! Plan validation against the set of available tools.
//!
//! Validation never fails fast: it walks the whole plan and returns every
//! problem as a [`PlanIssue`]. Callers decide what to do with warnings; any
//! error-severity issue makes the plan unrunnable.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeSet;
//! use mender_domain::plan::{Plan, PlanStep};
//!
//! let plan = Plan::new("greet").with_step(PlanStep::new("hello", "echo"));
//! let tools: BTreeSet<String> = ["echo".to_string()].into();
//! assert!(!Plan::has_errors(&plan.validate(&tools)));
//! ```

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

use super::entities::{Plan, PlanStep};
use super::reference::{Condition, Reference, ReferenceRoot, ReferenceText, classify_text, find_references};
use crate::core::duration::{MAX_DURATION_SECONDS, is_valid_seconds};
use crate::recovery::strategy::RecoveryAction;

/// Severity level of a plan issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The plan cannot run.
    Error,
    /// The plan runs but may not behave as intended.
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Identifies a specific plan issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum PlanIssueCode {
    /// The plan has no steps.
    EmptyPlan,
    /// Two steps share an id.
    DuplicateStepId { step_id: String },
    /// A step id is empty or collides with a reference root (`prev`, `inputs`).
    ReservedStepId { step_id: String },
    /// A step targets a tool that is not registered.
    UnknownTool { step_id: String, tool: String },
    /// `on_error = fallback:<tool>` names a tool that is not registered.
    UnknownFallbackTool { step_id: String, tool: String },
    /// A string looks like a reference but does not parse.
    MalformedReference { step_id: String, text: String },
    /// A `$<step>` reference to a step that is not declared earlier.
    UnresolvedReference { step_id: String, reference: String },
    /// The step condition is outside the condition grammar.
    InvalidCondition { step_id: String },
    /// The first step reads `$prev`, which is always null there.
    PrevInFirstStep { step_id: String },
    /// `$inputs.x` where `x` is not a declared plan input.
    UndeclaredInput { step_id: String, input: String },
    /// A fallback strategy without a fallback tool only stops the step.
    FallbackWithoutTool { category: String },
    /// A timeout, budget or recovery parameter is not a usable number.
    InvalidNumber { field: String },
}

/// A detected issue in a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanIssue {
    pub severity: Severity,
    #[serde(flatten)]
    pub code: PlanIssueCode,
    pub message: String,
}

impl PlanIssue {
    fn error(code: PlanIssueCode, message: String) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message,
        }
    }

    fn warning(code: PlanIssueCode, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message,
        }
    }

    fn invalid_seconds(field: String, seconds: f64) -> Self {
        Self::error(
            PlanIssueCode::InvalidNumber {
                field: field.clone(),
            },
            format!(
                "{} must be between 0 and {} seconds (got {})",
                field, MAX_DURATION_SECONDS, seconds
            ),
        )
    }
}

impl std::fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.severity.as_str(), self.message)
    }
}

impl Plan {
    /// Check tool availability, step ids, references and conditions.
    pub fn validate(&self, available_tools: &BTreeSet<String>) -> Vec<PlanIssue> {
        let mut issues = Vec::new();

        if self.steps.is_empty() {
            issues.push(PlanIssue::warning(
                PlanIssueCode::EmptyPlan,
                format!("plan '{}' has no steps", self.name),
            ));
        }

        if let Some(seconds) = self.timeout_seconds
            && !is_valid_seconds(seconds)
        {
            issues.push(PlanIssue::invalid_seconds("timeout_seconds".to_string(), seconds));
        }
        if let Some(usd) = self.cost_budget_usd
            && !(usd.is_finite() && usd >= 0.0)
        {
            issues.push(PlanIssue::error(
                PlanIssueCode::InvalidNumber {
                    field: "cost_budget_usd".to_string(),
                },
                format!("cost_budget_usd must be a non-negative amount (got {})", usd),
            ));
        }

        let mut declared: HashSet<&str> = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let id = step.id.as_str();

            if let Some(seconds) = step.timeout_seconds
                && !is_valid_seconds(seconds)
            {
                issues.push(PlanIssue::invalid_seconds(
                    format!("step '{}' timeout_seconds", id),
                    seconds,
                ));
            }

            if id.is_empty() || id == "prev" || id == "inputs" {
                issues.push(PlanIssue::error(
                    PlanIssueCode::ReservedStepId {
                        step_id: id.to_string(),
                    },
                    format!("step id '{}' is empty or reserved", id),
                ));
            }

            if declared.contains(id) {
                issues.push(PlanIssue::error(
                    PlanIssueCode::DuplicateStepId {
                        step_id: id.to_string(),
                    },
                    format!("duplicate step id '{}'", id),
                ));
            }

            if !available_tools.contains(&step.tool) {
                issues.push(PlanIssue::error(
                    PlanIssueCode::UnknownTool {
                        step_id: id.to_string(),
                        tool: step.tool.clone(),
                    },
                    format!("step '{}' uses unknown tool '{}'", id, step.tool),
                ));
            }

            if let Some(fallback) = step.on_error.fallback_tool()
                && !available_tools.contains(fallback)
            {
                issues.push(PlanIssue::error(
                    PlanIssueCode::UnknownFallbackTool {
                        step_id: id.to_string(),
                        tool: fallback.to_string(),
                    },
                    format!("step '{}' falls back to unknown tool '{}'", id, fallback),
                ));
            }

            for reference in self.step_references(step, &mut issues) {
                self.check_reference(index, step, &reference, &declared, &mut issues);
            }

            declared.insert(id);
        }

        for strategy in &self.error_handlers {
            if let Some(problem) = strategy.parameter_problem() {
                issues.push(PlanIssue::error(
                    PlanIssueCode::InvalidNumber {
                        field: format!("error_handlers.{}", strategy.category),
                    },
                    format!("{} handler: {}", strategy.category, problem),
                ));
            }
            if let RecoveryAction::Fallback { tool: None } = strategy.action {
                issues.push(PlanIssue::warning(
                    PlanIssueCode::FallbackWithoutTool {
                        category: strategy.category.to_string(),
                    },
                    format!(
                        "fallback handler for '{}' names no fallback tool",
                        strategy.category
                    ),
                ));
            }
        }

        issues
    }

    /// Whether any issue is error-severity.
    pub fn has_errors(issues: &[PlanIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Parsed references of a step's inputs, mappings and condition.
    /// Unparseable ones are reported and skipped.
    fn step_references(&self, step: &PlanStep, issues: &mut Vec<PlanIssue>) -> Vec<Reference> {
        let mut candidates: Vec<(String, ReferenceText)> = step
            .inputs
            .values()
            .flat_map(find_references)
            .collect();
        candidates.extend(
            step.input_mappings
                .values()
                .map(|text| (text.clone(), classify_text(text))),
        );

        let mut references = Vec::new();
        for (text, classified) in candidates {
            match classified {
                ReferenceText::Reference(reference) => references.push(reference),
                ReferenceText::Malformed => issues.push(PlanIssue::error(
                    PlanIssueCode::MalformedReference {
                        step_id: step.id.clone(),
                        text: text.clone(),
                    },
                    format!("step '{}' has malformed reference '{}'", step.id, text),
                )),
                ReferenceText::Literal | ReferenceText::Escaped(_) => {}
            }
        }

        if let Some(condition) = &step.condition {
            match Condition::parse(condition) {
                Ok(parsed) => references.extend(parsed.references().into_iter().cloned()),
                Err(e) => issues.push(PlanIssue::error(
                    PlanIssueCode::InvalidCondition {
                        step_id: step.id.clone(),
                    },
                    format!("step '{}': {}", step.id, e),
                )),
            }
        }

        references
    }

    fn check_reference(
        &self,
        index: usize,
        step: &PlanStep,
        reference: &Reference,
        declared: &HashSet<&str>,
        issues: &mut Vec<PlanIssue>,
    ) {
        match &reference.root {
            ReferenceRoot::Prev if index == 0 => issues.push(PlanIssue::warning(
                PlanIssueCode::PrevInFirstStep {
                    step_id: step.id.clone(),
                },
                format!("step '{}' reads $prev but is the first step", step.id),
            )),
            ReferenceRoot::Prev => {}
            ReferenceRoot::Inputs => {
                if let Some(name) = reference.path.first()
                    && !self.inputs.contains_key(name)
                {
                    issues.push(PlanIssue::warning(
                        PlanIssueCode::UndeclaredInput {
                            step_id: step.id.clone(),
                            input: name.clone(),
                        },
                        format!("step '{}' reads undeclared input '{}'", step.id, name),
                    ));
                }
            }
            ReferenceRoot::Step(target) => {
                if !declared.contains(target.as_str()) {
                    issues.push(PlanIssue::error(
                        PlanIssueCode::UnresolvedReference {
                            step_id: step.id.clone(),
                            reference: reference.to_string(),
                        },
                        format!(
                            "step '{}' references '{}', which is not an earlier step",
                            step.id, reference
                        ),
                    ));
                }
            }
        }
    }
}
