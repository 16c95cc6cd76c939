//! Tool Catalog
//!
//! The [`ToolCatalog`] is the registry of invocable tools. It keeps the
//! tools keyed by name plus three secondary indexes (category, tag, source)
//! and implements [`ToolCatalogPort`] for the executor and the router.
//!
//! # Usage
//!
//! ```ignore
//! use mender_infrastructure::tools::{ToolCatalog, builtin_source};
//!
//! let mut catalog = ToolCatalog::new();
//! let report = catalog.discover(&builtin_source());
//! assert!(catalog.get("echo").is_some());
//!
//! let workspace = catalog.by_category(ToolCategory::Workspace);
//! let hits = catalog.search("file", None, &[]);
//! ```
//!
//! # Versioning
//!
//! Identity is the tool name. Registering the same name and version again
//! is a no-op; a different version replaces the old entry and is logged.
//!
//! # Sharing
//!
//! Registration is a startup/admin operation. Hosts share the catalog as
//! `Arc<RwLock<ToolCatalog>>`; the port's lock impl recovers poisoning. Lookups
//! clone the [`Tool`] out so no lock is held across a tool call.

use super::source::{DiscoveryError, ToolSource};
use mender_application::ports::tool_catalog::ToolCatalogPort;
use mender_domain::tool::entities::INLINE_SOURCE;
use mender_domain::{Tool, ToolCategory};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// What `register` did with a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Added,
    /// Same name and version already present
    Unchanged,
    Replaced { previous_version: String },
}

/// Summary of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub source: String,
    /// Names added or replaced
    pub registered: Vec<String>,
    /// Names already present at the same version
    pub unchanged: Vec<String>,
    /// Human-readable reasons for skipped entries
    pub skipped: Vec<String>,
}

/// Registry of tools with category, tag and source indexes.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, Tool>,
    by_category: BTreeMap<ToolCategory, BTreeSet<String>>,
    by_tag: HashMap<String, BTreeSet<String>>,
    by_source: HashMap<String, BTreeSet<String>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a tool, or replace it when the version differs.
    pub fn register(&mut self, tool: Tool) -> RegisterOutcome {
        let name = tool.definition.name.clone();
        let previous = self.tools.get(&name).map(|t| t.definition.version.clone());
        let outcome = match previous {
            Some(version) if version == tool.definition.version => {
                debug!(tool = %name, %version, "Tool already registered");
                return RegisterOutcome::Unchanged;
            }
            Some(previous_version) => {
                warn!(
                    tool = %name,
                    previous = %previous_version,
                    version = %tool.definition.version,
                    "Overwriting tool with a new version"
                );
                self.unindex(&name);
                RegisterOutcome::Replaced { previous_version }
            }
            None => {
                debug!(
                    tool = %name,
                    category = %tool.definition.category,
                    source = %tool.definition.source,
                    "Registered tool"
                );
                RegisterOutcome::Added
            }
        };

        self.index(&tool);
        self.tools.insert(name, tool);
        outcome
    }

    /// Remove a tool and its index entries.
    pub fn unregister(&mut self, name: &str) -> Option<Tool> {
        self.unindex(name);
        let removed = self.tools.remove(name);
        if removed.is_some() {
            debug!(tool = name, "Unregistered tool");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tools, sorted by name.
    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn by_category(&self, category: ToolCategory) -> Vec<&Tool> {
        self.lookup_all(self.by_category.get(&category))
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&Tool> {
        self.lookup_all(self.by_tag.get(tag))
    }

    pub fn by_source(&self, source: &str) -> Vec<&Tool> {
        self.lookup_all(self.by_source.get(source))
    }

    /// Case-insensitive substring search on name and description,
    /// optionally restricted to a category and requiring every tag.
    pub fn search(
        &self,
        query: &str,
        category: Option<ToolCategory>,
        tags: &[String],
    ) -> Vec<&Tool> {
        self.tools
            .values()
            .filter(|t| t.definition.matches_query(query))
            .filter(|t| category.is_none_or(|c| t.definition.category == c))
            .filter(|t| tags.iter().all(|tag| t.definition.has_tag(tag)))
            .collect()
    }

    /// For each named tool, the declared dependencies missing from the
    /// catalog. Tools with nothing missing are omitted; unknown names are
    /// reported as missing themselves.
    pub fn validate_dependencies<S: AsRef<str>>(
        &self,
        names: &[S],
    ) -> BTreeMap<String, Vec<String>> {
        let mut missing = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let absent: Vec<String> = match self.tools.get(name) {
                Some(tool) => tool
                    .definition
                    .dependencies
                    .iter()
                    .filter(|dep| !self.tools.contains_key(*dep))
                    .cloned()
                    .collect(),
                None => vec![name.to_string()],
            };
            if !absent.is_empty() {
                missing.insert(name.to_string(), absent);
            }
        }
        missing
    }

    /// Register every valid entry of a source; bad entries are logged and
    /// skipped.
    pub fn discover(&mut self, source: &dyn ToolSource) -> DiscoveryReport {
        let mut report = DiscoveryReport {
            source: source.id().to_string(),
            ..Default::default()
        };

        for entry in source.discover() {
            let mut tool = match entry.and_then(check_tool) {
                Ok(tool) => tool,
                Err(e) => {
                    warn!(source = source.id(), error = %e, "Skipping tool entry");
                    report.skipped.push(e.to_string());
                    continue;
                }
            };
            if tool.definition.source == INLINE_SOURCE {
                tool.definition.source = source.id().to_string();
            }

            let name = tool.definition.name.clone();
            match self.register(tool) {
                RegisterOutcome::Unchanged => report.unchanged.push(name),
                _ => report.registered.push(name),
            }
        }

        info!(
            source = %report.source,
            registered = report.registered.len(),
            unchanged = report.unchanged.len(),
            skipped = report.skipped.len(),
            "Tool discovery finished"
        );
        report
    }

    fn lookup_all(&self, names: Option<&BTreeSet<String>>) -> Vec<&Tool> {
        names
            .into_iter()
            .flatten()
            .filter_map(|name| self.tools.get(name))
            .collect()
    }

    fn index(&mut self, tool: &Tool) {
        let name = &tool.definition.name;
        self.by_category
            .entry(tool.definition.category)
            .or_default()
            .insert(name.clone());
        for tag in &tool.definition.tags {
            self.by_tag
                .entry(tag.clone())
                .or_default()
                .insert(name.clone());
        }
        self.by_source
            .entry(tool.definition.source.clone())
            .or_default()
            .insert(name.clone());
    }

    fn unindex(&mut self, name: &str) {
        let Some(tool) = self.tools.get(name) else {
            return;
        };
        let definition = &tool.definition;
        if let Some(names) = self.by_category.get_mut(&definition.category) {
            names.remove(name);
        }
        for tag in &definition.tags {
            if let Some(names) = self.by_tag.get_mut(tag) {
                names.remove(name);
            }
        }
        if let Some(names) = self.by_source.get_mut(&definition.source) {
            names.remove(name);
        }
    }
}

fn check_tool(tool: Tool) -> Result<Tool, DiscoveryError> {
    let name = &tool.definition.name;
    if name.trim().is_empty() {
        return Err(DiscoveryError::InvalidTool {
            name: name.clone(),
            message: "name must not be empty".to_string(),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(DiscoveryError::InvalidTool {
            name: name.clone(),
            message: "name may only contain letters, digits, '_', '-' and '.'".to_string(),
        });
    }
    Ok(tool)
}

impl ToolCatalogPort for ToolCatalog {
    fn tool(&self, name: &str) -> Option<Tool> {
        self.tools.get(name).cloned()
    }

    fn tool_names(&self) -> BTreeSet<String> {
        self.tools.keys().cloned().collect()
    }

    fn category_of(&self, name: &str) -> Option<ToolCategory> {
        self.tools.get(name).map(|t| t.definition.category)
    }

    fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }
}
