//! Tool domain value objects: invocation results and failures
//!
//! A tool call produces either a [`ToolResponse`] or a [`ToolError`]. Both
//! carry [`Usage`] so cost and token totals can accumulate across failed
//! attempts as well as successful ones.
//!
//! [`ToolError::kind`] plays the role of an exception type name. The
//! classifier matches `"{kind}: {message}"` against its pattern table, so
//! kinds like `ConnectionError` or `TimeoutError` steer recovery.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Monetary and token usage reported by a tool call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub cost_usd: f64,
    #[serde(default)]
    pub tokens: u64,
}

impl Usage {
    pub fn new(cost_usd: f64, tokens: u64) -> Self {
        Self { cost_usd, tokens }
    }

    pub fn add(&mut self, other: Usage) {
        self.cost_usd += other.cost_usd;
        self.tokens += other.tokens;
    }

    pub fn is_zero(&self) -> bool {
        self.cost_usd == 0.0 && self.tokens == 0
    }
}

/// Successful output of a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResponse {
    pub output: serde_json::Value,
    pub usage: Usage,
}

impl ToolResponse {
    pub fn new(output: impl Into<serde_json::Value>) -> Self {
        Self {
            output: output.into(),
            usage: Usage::default(),
        }
    }

    pub fn with_usage(mut self, cost_usd: f64, tokens: u64) -> Self {
        self.usage = Usage::new(cost_usd, tokens);
        self
    }
}

impl From<serde_json::Value> for ToolResponse {
    fn from(output: serde_json::Value) -> Self {
        Self::new(output)
    }
}

/// Error raised by a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error type name (e.g., "ConnectionError", "ValidationError")
    pub kind: String,
    /// Human-readable error message
    pub message: String,
    /// Usage consumed before the failure
    #[serde(default, skip_serializing_if = "Usage::is_zero")]
    pub usage: Usage,
}

impl ToolError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            usage: Usage::default(),
        }
    }

    pub fn with_usage(mut self, cost_usd: f64, tokens: u64) -> Self {
        self.usage = Usage::new(cost_usd, tokens);
        self
    }

    // Common error constructors
    pub fn not_found(tool_name: impl Into<String>) -> Self {
        Self::new(
            "ToolNotFoundError",
            format!("Tool not found: {}", tool_name.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new("ValidationError", message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new("ExecutionError", message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            "TimeoutError",
            format!("operation timed out after {:.1}s", after.as_secs_f64()),
        )
    }

    /// Text the classifier matches against: `"{kind}: {message}"`.
    pub fn classification_text(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_display_matches_classification_text() {
        let err = ToolError::new("ConnectionError", "connection refused");
        assert_eq!(err.to_string(), "ConnectionError: connection refused");
        assert_eq!(err.classification_text(), err.to_string());
    }

    #[test]
    fn test_timeout_message_omits_tool_name() {
        let err = ToolError::timeout(Duration::from_millis(1500));
        assert_eq!(err.kind, "TimeoutError");
        assert_eq!(err.message, "operation timed out after 1.5s");
    }

    #[test]
    fn test_usage_accumulates() {
        let mut total = Usage::default();
        total.add(Usage::new(0.25, 100));
        total.add(ToolError::execution_failed("boom").with_usage(0.5, 20).usage);
        assert_eq!(total, Usage::new(0.75, 120));
    }

    #[test]
    fn test_response_from_value() {
        let response: ToolResponse = serde_json::json!({"ok": true}).into();
        assert!(response.usage.is_zero());
        assert_eq!(response.output["ok"], true);
    }
}
