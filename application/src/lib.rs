//! Application layer for mender
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.
//!
//! - [`AgentDirectory`] ranks execution profiles against a plan
//! - [`ExecutePlanUseCase`] runs a plan with self-healing recovery

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExecutorConfig;
pub use ports::{
    composite_progress::CompositeProgressNotifier,
    dependency_installer::{DependencyInstaller, InstallError, NoInstaller},
    execution_progress::{ExecutionProgressNotifier, NoExecutionProgress},
    tool_catalog::ToolCatalogPort,
};
pub use use_cases::agent_directory::{AgentDirectory, RankedAgent, RoutingError};
pub use use_cases::execute_plan::{ExecutePlanError, ExecutePlanUseCase};
