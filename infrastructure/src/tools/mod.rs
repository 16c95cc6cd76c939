//! Tool catalog and tool implementations
//!
//! This module provides the concrete tool registry plus the sources that
//! populate it.
//!
//! ## Sources
//!
//! Tools are organized into sources:
//! - `builtin`: Built-in tools (echo, read_file, run_command) - always available
//! - `manifest`: Command-template tools declared in `*.toml` manifests
//! - any [`StaticToolSource`] assembled by the host

pub mod builtin;
pub mod catalog;
pub mod command;
pub mod manifest;
pub mod source;

pub use builtin::builtin_source;
pub use catalog::{DiscoveryReport, RegisterOutcome, ToolCatalog};
pub use command::{CommandToolHandler, shell_escape};
pub use manifest::ManifestToolSource;
pub use source::{DiscoveryError, StaticToolSource, ToolSource};
