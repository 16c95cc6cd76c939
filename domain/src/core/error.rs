//! Domain error types

use crate::plan::validation::{PlanIssue, Severity};
use thiserror::Error;

/// Definition-time errors.
///
/// These surface synchronously from parsing, validation and composition and
/// are never retried. Run-time tool failures are modelled separately by
/// [`ToolError`](crate::tool::value_objects::ToolError).
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Failed to parse {format} plan: {message}")]
    PlanParse { format: String, message: String },

    #[error("Plan '{plan}' failed validation: {}", summarize_errors(.issues))]
    InvalidPlan { plan: String, issues: Vec<PlanIssue> },

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),

    #[error("Invalid reference '{0}'")]
    InvalidReference(String),

    #[error("Invalid condition '{condition}': {message}")]
    InvalidCondition { condition: String, message: String },

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid recovery strategy: {0}")]
    InvalidStrategy(String),

    #[error("Nothing to compose: no plan names given")]
    NothingToCompose,

    #[error("Failed to serialize plan: {0}")]
    Serialize(String),
}

impl DomainError {
    pub fn parse(format: impl Into<String>, message: impl std::fmt::Display) -> Self {
        DomainError::PlanParse {
            format: format.into(),
            message: message.to_string(),
        }
    }
}

fn summarize_errors(issues: &[PlanIssue]) -> String {
    issues
        .iter()
        .filter(|issue| issue.severity == Severity::Error)
        .map(|issue| issue.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::validation::PlanIssueCode;

    #[test]
    fn test_invalid_plan_lists_only_errors() {
        let error = DomainError::InvalidPlan {
            plan: "deploy".to_string(),
            issues: vec![
                PlanIssue {
                    severity: Severity::Warning,
                    code: PlanIssueCode::EmptyPlan,
                    message: "plan has no steps".to_string(),
                },
                PlanIssue {
                    severity: Severity::Error,
                    code: PlanIssueCode::DuplicateStepId {
                        step_id: "a".to_string(),
                    },
                    message: "duplicate step id 'a'".to_string(),
                },
            ],
        };

        assert_eq!(
            error.to_string(),
            "Plan 'deploy' failed validation: duplicate step id 'a'"
        );
    }

    #[test]
    fn test_missing_input_display() {
        let error = DomainError::MissingInput("region".to_string());
        assert_eq!(error.to_string(), "Missing required input: region");
    }
}
