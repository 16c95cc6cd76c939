//! Tool and plan discovery configuration (`[tools]` and `[plans]` sections)
//!
//! ```toml
//! [tools]
//! builtin = true                      # echo, read_file, run_command
//! manifest_dirs = ["./tools", "~/.config/mender/tools"]
//!
//! [plans]
//! dirs = ["./plans"]
//! ```
//!
//! A leading `~/` in any directory is expanded to the home directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw tools configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    /// Whether the builtin tools are registered
    pub builtin: bool,
    /// Directories scanned for `*.toml` tool manifests
    pub manifest_dirs: Vec<PathBuf>,
}

impl Default for FileToolsConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            manifest_dirs: Vec::new(),
        }
    }
}

impl FileToolsConfig {
    pub fn resolved_manifest_dirs(&self) -> Vec<PathBuf> {
        self.manifest_dirs.iter().map(|d| expand_home(d)).collect()
    }
}

/// Raw plans configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePlansConfig {
    /// Directories loaded into the plan library
    pub dirs: Vec<PathBuf>,
}

impl FilePlansConfig {
    pub fn resolved_dirs(&self) -> Vec<PathBuf> {
        self.dirs.iter().map(|d| expand_home(d)).collect()
    }
}

/// Expand a leading `~/`.
pub(crate) fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
