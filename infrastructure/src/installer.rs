//! Shell-based dependency installer
//!
//! Backs the `install_dependency` recovery action. The configured command
//! template receives the module name through the `{module}` placeholder,
//! shell-escaped like any other command-tool argument.

use crate::tools::command::{render_template, run_shell};
use async_trait::async_trait;
use mender_application::ports::dependency_installer::{DependencyInstaller, InstallError};
use mender_domain::ToolArgs;
use std::path::PathBuf;
use tracing::{info, warn};

/// Default installation command
pub const DEFAULT_INSTALL_COMMAND: &str = "pip install {module}";

/// Installer running a shell command per module.
#[derive(Debug, Clone)]
pub struct ShellDependencyInstaller {
    template: String,
    working_dir: Option<PathBuf>,
}

impl Default for ShellDependencyInstaller {
    fn default() -> Self {
        Self::new(DEFAULT_INSTALL_COMMAND)
    }
}

impl ShellDependencyInstaller {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Package-like names only: letters, digits, `_`, `-` and `.`, starting
/// with a letter or digit.
fn is_valid_module(module: &str) -> bool {
    module
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
        && module
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[async_trait]
impl DependencyInstaller for ShellDependencyInstaller {
    async fn install(&self, module: &str) -> Result<(), InstallError> {
        if !is_valid_module(module) {
            warn!(module, "Rejected dependency installation");
            return Err(InstallError::InvalidModule(module.to_string()));
        }

        let mut args = ToolArgs::new();
        args.insert("module".to_string(), module.into());
        let command = render_template(&self.template, &args);

        info!(module, command = %command, "Installing missing dependency");
        run_shell(&command, self.working_dir.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| InstallError::Failed {
                module: module.to_string(),
                message: e.message,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_validation() {
        assert!(is_valid_module("numpy"));
        assert!(is_valid_module("ruamel.yaml"));
        assert!(is_valid_module("scikit-learn"));
        assert!(!is_valid_module(""));
        assert!(!is_valid_module("-e"));
        assert!(!is_valid_module("numpy; rm -rf /"));
    }

    #[tokio::test]
    async fn test_rejects_suspicious_module() {
        let installer = ShellDependencyInstaller::new("true");
        let err = installer.install("$(reboot)").await.unwrap_err();
        assert_eq!(err, InstallError::InvalidModule("$(reboot)".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_template_with_module() {
        let dir = tempfile::tempdir().unwrap();
        let installer =
            ShellDependencyInstaller::new("touch {module}.installed").with_working_dir(dir.path());

        installer.install("requests").await.unwrap();
        assert!(dir.path().join("requests.installed").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_command_reports_failure() {
        let installer = ShellDependencyInstaller::new("echo 'no matching distribution' >&2; exit 1");
        match installer.install("nothing").await {
            Err(InstallError::Failed { module, message }) => {
                assert_eq!(module, "nothing");
                assert!(message.contains("no matching distribution"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
