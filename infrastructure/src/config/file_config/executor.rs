//! Executor configuration from TOML (`[executor]` section)

use super::issue::{ConfigIssue, ConfigIssueCode};
use mender_application::ExecutorConfig;
use mender_domain::{MAX_DURATION_SECONDS, is_valid_seconds, saturating_duration};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw executor configuration from TOML
///
/// # Example
///
/// ```toml
/// [executor]
/// max_retries = 3                 # when neither step nor tool sets one
/// default_timeout_seconds = 300   # per attempt
/// auth_refresh_delay_ms = 1000    # pause of the refresh_auth action
/// timeout_growth_factor = 2.0     # factor of the increase_timeout action
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileExecutorConfig {
    pub max_retries: u32,
    pub default_timeout_seconds: f64,
    pub auth_refresh_delay_ms: u64,
    pub timeout_growth_factor: f64,
}

impl Default for FileExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_timeout_seconds: 300.0,
            auth_refresh_delay_ms: 1000,
            timeout_growth_factor: 2.0,
        }
    }
}

impl FileExecutorConfig {
    /// Build the executor defaults, replacing out-of-range values with the
    /// built-in ones.
    pub fn to_executor_config(&self) -> (ExecutorConfig, Vec<ConfigIssue>) {
        let defaults = Self::default();
        let mut issues = Vec::new();

        let timeout = if is_valid_seconds(self.default_timeout_seconds) {
            self.default_timeout_seconds
        } else {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "executor.default_timeout_seconds".to_string(),
                },
                format!(
                    "executor.default_timeout_seconds must be between 0 and {} (got {}), using {}",
                    MAX_DURATION_SECONDS, self.default_timeout_seconds, defaults.default_timeout_seconds
                ),
            ));
            defaults.default_timeout_seconds
        };

        let growth = if self.timeout_growth_factor.is_finite() && self.timeout_growth_factor >= 1.0
        {
            self.timeout_growth_factor
        } else {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "executor.timeout_growth_factor".to_string(),
                },
                format!(
                    "executor.timeout_growth_factor must be at least 1.0 (got {}), using {}",
                    self.timeout_growth_factor, defaults.timeout_growth_factor
                ),
            ));
            defaults.timeout_growth_factor
        };

        let config = ExecutorConfig::default()
            .with_max_retries(self.max_retries)
            .with_default_timeout(saturating_duration(timeout))
            .with_auth_refresh_delay(Duration::from_millis(self.auth_refresh_delay_ms))
            .with_timeout_growth_factor(growth);

        (config, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_executor_defaults() {
        let (config, issues) = FileExecutorConfig::default().to_executor_config();
        assert!(issues.is_empty());
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.default_timeout, Duration::from_secs(300));
        assert_eq!(config.auth_refresh_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let file = FileExecutorConfig {
            default_timeout_seconds: 0.0,
            timeout_growth_factor: 0.5,
            ..Default::default()
        };
        let (config, issues) = file.to_executor_config();

        assert_eq!(issues.len(), 2);
        assert_eq!(config.default_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_unrepresentable_timeout_falls_back() {
        for seconds in [1e20, f64::INFINITY, f64::NAN] {
            let file = FileExecutorConfig {
                default_timeout_seconds: seconds,
                ..Default::default()
            };
            let (config, issues) = file.to_executor_config();
            assert_eq!(issues.len(), 1);
            assert_eq!(config.default_timeout, Duration::from_secs(300));
        }
    }
}
