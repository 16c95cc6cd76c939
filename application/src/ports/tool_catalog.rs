//! Tool catalog port
//!
//! Read access to the registered tools. The executor and the router only
//! look tools up; registration, search and discovery belong to the
//! infrastructure adapter (`ToolCatalog`).

use mender_domain::{Tool, ToolCategory};
use std::collections::BTreeSet;
use std::sync::RwLock;

/// Port for looking up tools
///
/// Lookups return owned [`Tool`]s (the handler is an `Arc`), so adapters
/// guarded by a lock never hand out borrows across an `.await`.
pub trait ToolCatalogPort: Send + Sync {
    /// Get a tool by name
    fn tool(&self, name: &str) -> Option<Tool>;

    /// Names of all registered tools
    fn tool_names(&self) -> BTreeSet<String>;

    /// Category of a registered tool
    fn category_of(&self, name: &str) -> Option<ToolCategory> {
        self.tool(name).map(|t| t.definition.category)
    }

    /// Check if a tool is registered
    fn has_tool(&self, name: &str) -> bool {
        self.tool(name).is_some()
    }
}

/// A catalog behind a lock. Lookups recover a poisoned lock instead of
/// reporting an empty catalog.
impl<C: ToolCatalogPort> ToolCatalogPort for RwLock<C> {
    fn tool(&self, name: &str) -> Option<Tool> {
        self.read().unwrap_or_else(|e| e.into_inner()).tool(name)
    }

    fn tool_names(&self) -> BTreeSet<String> {
        self.read().unwrap_or_else(|e| e.into_inner()).tool_names()
    }

    fn category_of(&self, name: &str) -> Option<ToolCategory> {
        self.read().unwrap_or_else(|e| e.into_inner()).category_of(name)
    }

    fn has_tool(&self, name: &str) -> bool {
        self.read().unwrap_or_else(|e| e.into_inner()).has_tool(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_domain::{ToolDefinition, ToolResponse};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct MapCatalog(BTreeMap<String, Tool>);

    impl ToolCatalogPort for MapCatalog {
        fn tool(&self, name: &str) -> Option<Tool> {
            self.0.get(name).cloned()
        }

        fn tool_names(&self) -> BTreeSet<String> {
            self.0.keys().cloned().collect()
        }
    }

    fn catalog(names: &[&str]) -> MapCatalog {
        MapCatalog(
            names
                .iter()
                .map(|name| {
                    let definition = ToolDefinition::new(*name, "test", ToolCategory::Data);
                    let tool = Tool::from_fn(definition, |_| Ok(ToolResponse::new("ok")));
                    (name.to_string(), tool)
                })
                .collect(),
        )
    }

    #[test]
    fn test_locked_catalog_delegates() {
        let shared = RwLock::new(catalog(&["echo"]));

        assert!(shared.has_tool("echo"));
        assert!(!shared.has_tool("missing"));
        assert_eq!(shared.category_of("echo"), Some(ToolCategory::Data));
        assert!(shared.tool_names().contains("echo"));
    }

    #[test]
    fn test_poisoned_lock_still_serves_tools() {
        let shared = Arc::new(RwLock::new(catalog(&["echo", "fetch"])));
        let writer = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _guard = writer.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(shared.is_poisoned());

        assert_eq!(shared.tool_names().len(), 2);
        assert!(shared.tool("fetch").is_some());
        assert!(shared.has_tool("echo"));
        assert_eq!(shared.category_of("echo"), Some(ToolCategory::Data));
    }
}
