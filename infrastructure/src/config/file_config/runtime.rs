//! Installer and logging configuration (`[installer]` and `[logging]` sections)
//!
//! ```toml
//! [installer]
//! enabled = true
//! command = "uv pip install {module}"
//!
//! [logging]
//! dir = "~/.local/state/mender/logs"   # daily-rolling tracing log
//! run_log = "runs.jsonl"               # JSONL run events, relative to dir
//! ```

use super::tools::expand_home;
use crate::installer::DEFAULT_INSTALL_COMMAND;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw dependency installer configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileInstallerConfig {
    /// Disabled unless set
    pub enabled: bool,
    /// Command template; `{module}` receives the missing module name
    pub command: String,
    pub working_dir: Option<PathBuf>,
}

impl Default for FileInstallerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: DEFAULT_INSTALL_COMMAND.to_string(),
            working_dir: None,
        }
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for the daily-rolling log file; console only when unset
    pub dir: Option<PathBuf>,
    /// JSONL run-event log; relative paths resolve against `dir`
    pub run_log: Option<PathBuf>,
}

impl FileLoggingConfig {
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        self.dir.as_deref().map(expand_home)
    }

    pub fn resolved_run_log(&self) -> Option<PathBuf> {
        let run_log = expand_home(self.run_log.as_deref()?);
        match self.resolved_dir() {
            Some(dir) if run_log.is_relative() => Some(dir.join(run_log)),
            _ => Some(run_log),
        }
    }
}
