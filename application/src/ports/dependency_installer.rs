//! Dependency installer port
//!
//! Invoked by the `install_dependency` recovery action with the module name
//! parsed from the failing tool's error text. A failed installation ends the
//! step's recovery: it is never retried.
//!
//! # Built-in Implementations
//!
//! - [`NoInstaller`] - Always refuses; installation disabled
//!
//! The shell-based adapter lives in the infrastructure layer.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while installing a dependency.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstallError {
    #[error("Dependency installation is disabled")]
    Disabled,

    #[error("Refusing to install suspicious module name '{0}'")]
    InvalidModule(String),

    #[error("Installing '{module}' failed: {message}")]
    Failed { module: String, message: String },
}

/// Port for installing a missing dependency
#[async_trait]
pub trait DependencyInstaller: Send + Sync {
    async fn install(&self, module: &str) -> Result<(), InstallError>;
}

/// Installer that never installs anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInstaller;

#[async_trait]
impl DependencyInstaller for NoInstaller {
    async fn install(&self, _module: &str) -> Result<(), InstallError> {
        Err(InstallError::Disabled)
    }
}
