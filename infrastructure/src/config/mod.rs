//! Configuration file loading for mender
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `MENDER_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./mender.toml` or `./.mender.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/mender/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigIssue, ConfigIssueCode, FileAgentConfig, FileConfig, FileExecutorConfig,
    FileInstallerConfig, FileLoggingConfig, FilePlansConfig, FileRecoveryConfig, FileToolsConfig,
    Severity, parse_strategies,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
