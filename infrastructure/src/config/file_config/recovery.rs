//! Process-wide recovery overrides from TOML (`[[recovery]]` entries)
//!
//! Entries use the same flat form as a plan's `error_handlers` and replace
//! the built-in strategy of their category:
//!
//! ```toml
//! [[recovery]]
//! error_type = "network"
//! action = "retry_with_backoff"
//! max_attempts = 5
//! backoff_seconds = 0.5
//!
//! [[recovery]]
//! error_type = "resource_not_found"
//! action = "fallback"
//! fallback_tool = "read_cache"
//! ```

use super::issue::{ConfigIssue, ConfigIssueCode};
use mender_domain::RecoveryStrategy;
use serde::{Deserialize, Serialize};

/// Raw recovery strategy from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecoveryConfig {
    pub error_type: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_severity: Option<String>,
}

impl FileRecoveryConfig {
    /// Convert through the plan document form so both share one set of rules.
    pub fn to_strategy(&self) -> Result<RecoveryStrategy, String> {
        let document = serde_json::to_value(self).map_err(|e| e.to_string())?;
        serde_json::from_value(document).map_err(|e| e.to_string())
    }
}

/// Convert every entry, turning failures into error issues.
pub fn parse_strategies(entries: &[FileRecoveryConfig]) -> (Vec<RecoveryStrategy>, Vec<ConfigIssue>) {
    let mut strategies = Vec::new();
    let mut issues = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match entry.to_strategy() {
            Ok(strategy) => strategies.push(strategy),
            Err(message) => issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidStrategy { index },
                format!("recovery[{}] ({}): {}", index, entry.error_type, message),
            )),
        }
    }

    (strategies, issues)
}
