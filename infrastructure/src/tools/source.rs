//! Tool sources for catalog discovery
//!
//! A [`ToolSource`] produces tools for [`ToolCatalog::discover`]. Each entry
//! is reported separately so one bad entry never aborts the pass.
//!
//! # Built-in Sources
//!
//! | Source | ID | Produces |
//! |--------|----|----------|
//! | [`StaticToolSource`] | caller-chosen | tools handed over at construction |
//! | [`ManifestToolSource`](super::manifest::ManifestToolSource) | `manifest` | `[[tools]]` entries from `*.toml` files |
//! | [`builtin_source`](super::builtin::builtin_source) | `builtin` | `echo`, `read_file`, `run_command` |
//!
//! [`ToolCatalog::discover`]: super::catalog::ToolCatalog::discover

use mender_domain::Tool;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised for individual discovery entries.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("Invalid tool '{name}': {message}")]
    InvalidTool { name: String, message: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },
}

/// A namespace of tools that can be discovered into a catalog.
pub trait ToolSource: Send + Sync {
    /// Stable identifier, recorded as each tool's `source` unless the tool
    /// already names one
    fn id(&self) -> &str;

    /// Produce every entry, failed ones included.
    fn discover(&self) -> Vec<Result<Tool, DiscoveryError>>;
}

/// Source over an explicit list of tools.
#[derive(Debug, Clone)]
pub struct StaticToolSource {
    id: String,
    tools: Vec<Tool>,
}

impl StaticToolSource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tools: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = Tool>) -> Self {
        self.tools.extend(tools);
        self
    }
}

impl ToolSource for StaticToolSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn discover(&self) -> Vec<Result<Tool, DiscoveryError>> {
        self.tools.iter().cloned().map(Ok).collect()
    }
}
