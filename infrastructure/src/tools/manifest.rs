//! Manifest tool source: command-template tools declared in TOML files.
//!
//! Every `*.toml` file in the configured directories may declare any number
//! of tools. Each tool wraps a shell command template with `{param_name}`
//! placeholders (see [`CommandToolHandler`]).
//!
//! # Example Manifest
//!
//! ```toml
//! [[tools]]
//! name = "deploy_service"
//! description = "Roll out a service to the cluster"
//! category = "deployment"
//! command = "kubectl rollout restart deployment/{service} -n {namespace}"
//! version = "1.1.0"
//! tags = ["k8s", "prod"]
//! max_retries = 2
//! timeout_seconds = 120
//!
//! [[tools.inputs]]
//! name = "service"
//! required = true
//!
//! [[tools.inputs]]
//! name = "namespace"
//! default = "default"
//! ```
//!
//! Unreadable or malformed files and invalid entries are reported
//! individually; the rest of the pass continues.

use super::command::CommandToolHandler;
use super::source::{DiscoveryError, ToolSource};
use mender_domain::tool::entities::DEFAULT_TOOL_VERSION;
use mender_domain::{Tool, ToolCategory, ToolDefinition, ToolInput, ToolOutput};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source id for manifest-declared tools
pub const MANIFEST_SOURCE: &str = "manifest";

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    tools: Vec<ManifestTool>,
}

#[derive(Debug, Deserialize)]
struct ManifestTool {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
    command: String,
    #[serde(default)]
    inputs: Vec<ToolInput>,
    #[serde(default)]
    output: Option<ToolOutput>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default)]
    timeout_seconds: Option<f64>,
    #[serde(default)]
    working_dir: Option<PathBuf>,
}

/// Tool source scanning TOML manifests.
#[derive(Debug, Clone)]
pub struct ManifestToolSource {
    paths: Vec<PathBuf>,
    pattern: String,
}

impl ManifestToolSource {
    /// Scan the given directories (or individual files).
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            pattern: "*.toml".to_string(),
        }
    }

    /// File-name pattern used inside directories (default `*.toml`).
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    fn manifest_files(&self) -> Vec<Result<PathBuf, DiscoveryError>> {
        let mut files = Vec::new();
        for path in &self.paths {
            if path.is_file() {
                files.push(Ok(path.clone()));
                continue;
            }
            if !path.is_dir() {
                debug!(path = %path.display(), "Manifest directory does not exist");
                continue;
            }

            let pattern = path.join(&self.pattern).to_string_lossy().into_owned();
            match glob::glob(&pattern) {
                Ok(entries) => {
                    let mut found: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
                    found.sort();
                    files.extend(found.into_iter().map(Ok));
                }
                Err(e) => files.push(Err(DiscoveryError::Pattern {
                    pattern,
                    message: e.to_string(),
                })),
            }
        }
        files
    }
}

impl ToolSource for ManifestToolSource {
    fn id(&self) -> &str {
        MANIFEST_SOURCE
    }

    fn discover(&self) -> Vec<Result<Tool, DiscoveryError>> {
        let mut tools = Vec::new();
        for file in self.manifest_files() {
            match file.and_then(|path| load_manifest(&path).map(|m| (path, m))) {
                Ok((path, manifest)) => tools.extend(
                    manifest
                        .tools
                        .into_iter()
                        .map(|entry| build_tool(entry, &path)),
                ),
                Err(e) => tools.push(Err(e)),
            }
        }
        tools
    }
}

fn load_manifest(path: &Path) -> Result<ManifestFile, DiscoveryError> {
    let text = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|e| DiscoveryError::Manifest {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn build_tool(entry: ManifestTool, path: &Path) -> Result<Tool, DiscoveryError> {
    let invalid = |message: String| DiscoveryError::InvalidTool {
        name: entry.name.clone(),
        message,
    };

    if entry.command.trim().is_empty() {
        return Err(invalid("command must not be empty".to_string()));
    }
    let category = match &entry.category {
        Some(raw) => raw.parse::<ToolCategory>().map_err(invalid)?,
        None => ToolCategory::General,
    };

    let mut definition = ToolDefinition::new(&entry.name, &entry.description, category)
        .with_version(
            entry
                .version
                .clone()
                .unwrap_or_else(|| DEFAULT_TOOL_VERSION.to_string()),
        )
        .with_source(format!("{}:{}", MANIFEST_SOURCE, path.display()));
    for input in entry.inputs {
        definition = definition.with_input(input);
    }
    if let Some(output) = entry.output {
        definition = definition.with_output(output);
    }
    for tag in entry.tags {
        definition = definition.with_tag(tag);
    }
    for dependency in entry.dependencies {
        definition = definition.with_dependency(dependency);
    }
    if let Some(max_retries) = entry.max_retries {
        definition = definition.with_max_retries(max_retries);
    }
    if let Some(seconds) = entry.timeout_seconds {
        definition = definition.with_timeout_seconds(seconds);
    }

    let mut handler = CommandToolHandler::new(entry.command);
    if let Some(dir) = entry.working_dir {
        let dir = match path.parent() {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir,
        };
        handler = handler.with_working_dir(dir);
    }

    Ok(Tool::new(definition, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::catalog::ToolCatalog;

    const DEPLOY_MANIFEST: &str = r#"
[[tools]]
name = "deploy_service"
description = "Roll out a service"
category = "deployment"
command = "echo deploying {service}"
version = "1.1.0"
tags = ["k8s"]
max_retries = 2

[[tools.inputs]]
name = "service"
required = true

[[tools.inputs]]
name = "namespace"
default = "default"

[[tools]]
name = "broken"
category = "spaceship"
command = "true"

[[tools]]
name = "empty"
command = "  "
"#;

    #[test]
    fn test_discovers_valid_entries_and_reports_bad_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("deploy.toml"), DEPLOY_MANIFEST).unwrap();
        std::fs::write(dir.path().join("garbage.toml"), "[[tools]\nname =").unwrap();
        std::fs::write(dir.path().join("notes.md"), "ignored").unwrap();

        let mut catalog = ToolCatalog::new();
        let report = catalog.discover(&ManifestToolSource::new([dir.path()]));

        assert_eq!(report.registered, vec!["deploy_service".to_string()]);
        assert_eq!(report.skipped.len(), 3);

        let tool = catalog.get("deploy_service").unwrap();
        assert_eq!(tool.definition.category, ToolCategory::Deployment);
        assert_eq!(tool.definition.version, "1.1.0");
        assert_eq!(tool.definition.max_retries, Some(2));
        assert!(tool.definition.input("service").unwrap().required);
        assert!(tool.definition.source.starts_with("manifest:"));
        assert_eq!(catalog.by_tag("k8s").len(), 1);
    }

    #[test]
    fn test_missing_directory_is_ignored() {
        let source = ManifestToolSource::new(["/nonexistent/manifests"]);
        assert!(source.discover().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_manifest_tool_runs_its_command() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.toml");
        std::fs::write(&path, DEPLOY_MANIFEST).unwrap();

        let tools: Vec<Tool> = ManifestToolSource::new([path])
            .discover()
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        let mut args = mender_domain::ToolArgs::new();
        args.insert("service".to_string(), "api".into());

        let response = tools[0].handler.invoke(&args).await.unwrap();
        assert_eq!(response.output, serde_json::json!("deploying api"));
    }
}
