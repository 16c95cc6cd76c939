//! Infrastructure layer for mender
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, plus configuration and plan file loading.
//!
//! - [`ToolCatalog`] implements `ToolCatalogPort`
//! - [`ShellDependencyInstaller`] implements `DependencyInstaller`
//! - [`JsonlRunLogger`] implements `ExecutionProgressNotifier`
//! - [`EngineContext`] wires everything for a hosting process

pub mod bootstrap;
pub mod config;
pub mod installer;
pub mod logging;
pub mod plans;
pub mod tools;

// Re-export commonly used types
pub use bootstrap::{BootReport, EngineContext};
pub use config::{ConfigIssue, ConfigLoader, FileConfig};
pub use installer::ShellDependencyInstaller;
pub use logging::JsonlRunLogger;
pub use plans::{PlanLoadError, load_plan_file};
pub use tools::{
    CommandToolHandler, DiscoveryError, DiscoveryReport, ManifestToolSource, RegisterOutcome,
    StaticToolSource, ToolCatalog, ToolSource, builtin_source,
};
