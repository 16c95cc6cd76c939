//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod composite_progress;
pub mod dependency_installer;
pub mod execution_progress;
pub mod tool_catalog;
