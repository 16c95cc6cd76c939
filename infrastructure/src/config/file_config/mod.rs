//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Enumerated values stay strings here and are parsed on conversion, so a
//! typo degrades to a default plus a [`ConfigIssue`] instead of failing the
//! whole load.

mod agents;
mod executor;
mod issue;
mod recovery;
mod runtime;
mod tools;

pub use agents::FileAgentConfig;
pub use executor::FileExecutorConfig;
pub use issue::{ConfigIssue, ConfigIssueCode, Severity};
pub use recovery::{FileRecoveryConfig, parse_strategies};
pub use runtime::{FileInstallerConfig, FileLoggingConfig};
pub use tools::{FilePlansConfig, FileToolsConfig};

use mender_application::ExecutorConfig;
use mender_domain::AgentProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Attempt loop defaults
    pub executor: FileExecutorConfig,
    /// Tool discovery
    pub tools: FileToolsConfig,
    /// Plan library directories
    pub plans: FilePlansConfig,
    /// Agent profiles, in registration order
    pub agents: Vec<FileAgentConfig>,
    /// Process-wide overrides of the built-in recovery strategies
    pub recovery: Vec<FileRecoveryConfig>,
    /// Dependency installer for `install_dependency`
    pub installer: FileInstallerConfig,
    /// Log file and JSONL run log locations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Executor defaults with the `[[recovery]]` overrides applied.
    ///
    /// Invalid recovery entries are left out.
    pub fn executor_config(&self) -> (ExecutorConfig, Vec<ConfigIssue>) {
        let (mut config, mut issues) = self.executor.to_executor_config();
        let (strategies, strategy_issues) = parse_strategies(&self.recovery);
        issues.extend(strategy_issues);
        for strategy in strategies {
            config = config.with_strategy(strategy);
        }
        (config, issues)
    }

    /// Agent profiles in declaration order, nameless entries dropped.
    pub fn agent_profiles(&self) -> (Vec<AgentProfile>, Vec<ConfigIssue>) {
        let mut profiles = Vec::new();
        let mut issues = Vec::new();

        for (index, agent) in self.agents.iter().enumerate() {
            if agent.name.trim().is_empty() {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::EmptyAgentName { index },
                    format!("agents[{}]: name must not be empty", index),
                ));
                continue;
            }
            let (profile, agent_issues) = agent.to_profile();
            issues.extend(agent_issues);
            profiles.push(profile);
        }

        (profiles, issues)
    }

    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. Executor values out of range
    /// 2. `[[recovery]]` entries that do not form a strategy
    /// 3. Agent names (empty, duplicated) and enum fields
    /// 4. An installer template without `{module}`
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.executor_config().1;
        issues.extend(self.agent_profiles().1);

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !agent.name.trim().is_empty() && !seen.insert(agent.name.as_str()) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::DuplicateAgent {
                        name: agent.name.clone(),
                    },
                    format!(
                        "agents: '{}' is declared more than once, the last entry wins",
                        agent.name
                    ),
                ));
            }
        }

        if self.installer.enabled && !self.installer.command.contains("{module}") {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InstallerWithoutModule,
                format!(
                    "installer.command '{}' has no {{module}} placeholder",
                    self.installer.command
                ),
            ));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_domain::{ErrorCategory, RecoveryAction};
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[executor]
max_retries = 5
default_timeout_seconds = 30

[tools]
builtin = false
manifest_dirs = ["./tools"]

[plans]
dirs = ["./plans"]

[[agents]]
name = "ops"
domain = "deployment"
tools = ["deploy_service"]

[[agents]]
name = "reporter"
domain = "communication"

[[recovery]]
error_type = "timeout"
action = "abort"
max_attempts = 1

[installer]
enabled = true
command = "uv pip install {module}"

[logging]
dir = "/tmp/mender-logs"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.tools.builtin);
        assert_eq!(config.plans.dirs, vec![PathBuf::from("./plans")]);
        assert_eq!(config.agents.len(), 2);
        assert!(config.installer.enabled);
        assert!(config.validate().is_empty());

        let (executor, _) = config.executor_config();
        assert_eq!(executor.max_retries, 5);
        assert_eq!(executor.default_timeout, Duration::from_secs(30));
        let timeout = executor
            .strategies
            .iter()
            .find(|s| s.category == ErrorCategory::Timeout)
            .unwrap();
        assert_eq!(timeout.action, RecoveryAction::Abort);
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.tools.builtin);
        assert!(!config.installer.enabled);
        assert!(config.agents.is_empty());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let toml_str = r#"
[[agents]]
name = "ops"

[[agents]]
name = "ops"
compute_tier = "gigantic"

[[agents]]
name = ""

[[recovery]]
error_type = "network"
action = "reboot"

[installer]
enabled = true
command = "pip install requests"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let codes: Vec<ConfigIssueCode> = config.validate().into_iter().map(|i| i.code).collect();

        assert!(codes.contains(&ConfigIssueCode::InvalidStrategy { index: 0 }));
        assert!(codes.contains(&ConfigIssueCode::EmptyAgentName { index: 2 }));
        assert!(codes.contains(&ConfigIssueCode::DuplicateAgent {
            name: "ops".to_string()
        }));
        assert!(codes.contains(&ConfigIssueCode::InstallerWithoutModule));
        assert!(codes.iter().any(|c| matches!(
            c,
            ConfigIssueCode::InvalidEnumValue { field, .. } if field == "agents.ops.compute_tier"
        )));
    }
}
