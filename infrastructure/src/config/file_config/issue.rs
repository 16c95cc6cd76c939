//! Structured configuration issues

pub use mender_domain::Severity;

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A string field holds a value outside its enumeration.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A numeric field is out of range.
    InvalidValue { field: String },
    /// A `[[recovery]]` entry cannot be turned into a strategy.
    InvalidStrategy { index: usize },
    /// Two `[[agents]]` entries share a name.
    DuplicateAgent { name: String },
    /// An `[[agents]]` entry has an empty name.
    EmptyAgentName { index: usize },
    /// The installer command never mentions `{module}`.
    InstallerWithoutModule,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }
}
