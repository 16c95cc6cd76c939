//! Tool domain entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Version assigned to tools that do not declare one.
pub const DEFAULT_TOOL_VERSION: &str = "1.0.0";

/// Source label for tools registered directly by the host process.
pub const INLINE_SOURCE: &str = "inline";

/// Functional category of a tool.
///
/// The declaration order matters: when two categories are equally frequent
/// among a plan's required tools, the one declared first wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    Data,
    Communication,
    Deployment,
    Monitoring,
    Storage,
    Integration,
    Workspace,
    Security,
    Browser,
    #[default]
    General,
}

impl ToolCategory {
    /// All categories in declaration order.
    pub const ALL: [ToolCategory; 10] = [
        ToolCategory::Data,
        ToolCategory::Communication,
        ToolCategory::Deployment,
        ToolCategory::Monitoring,
        ToolCategory::Storage,
        ToolCategory::Integration,
        ToolCategory::Workspace,
        ToolCategory::Security,
        ToolCategory::Browser,
        ToolCategory::General,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ToolCategory::Data => "data",
            ToolCategory::Communication => "communication",
            ToolCategory::Deployment => "deployment",
            ToolCategory::Monitoring => "monitoring",
            ToolCategory::Storage => "storage",
            ToolCategory::Integration => "integration",
            ToolCategory::Workspace => "workspace",
            ToolCategory::Security => "security",
            ToolCategory::Browser => "browser",
            ToolCategory::General => "general",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ToolCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        ToolCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("unknown tool category '{}'", s))
    }
}

/// A named, typed input of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInput {
    /// Input name (the argument key)
    pub name: String,
    /// Type tag (e.g., "string", "number", "object")
    #[serde(rename = "type", default = "default_type")]
    pub input_type: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Whether callers must provide this input
    #[serde(default)]
    pub required: bool,
    /// Value used when the caller omits the input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

fn default_type() -> String {
    "string".to_string()
}

impl ToolInput {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            input_type: default_type(),
            description: description.into(),
            required,
            default: None,
        }
    }

    pub fn with_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = input_type.into();
        self
    }

    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Descriptor of the value a tool returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    #[serde(rename = "type", default = "default_type")]
    pub output_type: String,
    #[serde(default)]
    pub description: String,
}

impl ToolOutput {
    pub fn new(output_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            output_type: output_type.into(),
            description: description.into(),
        }
    }
}

/// Static description of an invocable capability.
///
/// Identity is the name. The invocation handle lives next to the definition
/// in [`Tool`](super::handler::Tool).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "deploy_service")
    pub name: String,
    /// Human-readable description
    pub description: String,
    pub category: ToolCategory,
    /// Ordered input specifications
    pub inputs: Vec<ToolInput>,
    pub output: Option<ToolOutput>,
    /// Whether the underlying call suspends (network, process) rather than computing inline
    pub is_async: bool,
    /// Retry ceiling used when a step does not set its own
    pub max_retries: Option<u32>,
    /// Per-attempt timeout used when a step does not set its own
    pub timeout_seconds: Option<f64>,
    pub tags: BTreeSet<String>,
    /// Names of tools that must be registered for this one to work
    pub dependencies: Vec<String>,
    /// Semantic version; a different version overwrites on registration
    pub version: String,
    /// Where the tool came from ("builtin", "inline", "manifest:<path>")
    pub source: String,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            inputs: Vec::new(),
            output: None,
            is_async: true,
            max_retries: None,
            timeout_seconds: None,
            tags: BTreeSet::new(),
            dependencies: Vec::new(),
            version: DEFAULT_TOOL_VERSION.to_string(),
            source: INLINE_SOURCE.to_string(),
        }
    }

    pub fn with_input(mut self, input: ToolInput) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: ToolOutput) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_dependency(mut self, tool_name: impl Into<String>) -> Self {
        self.dependencies.push(tool_name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn synchronous(mut self) -> Self {
        self.is_async = false;
        self
    }

    pub fn input(&self, name: &str) -> Option<&ToolInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Case-insensitive substring match on name or description.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_and_display() {
        assert_eq!("Deployment".parse::<ToolCategory>(), Ok(ToolCategory::Deployment));
        assert_eq!(ToolCategory::Browser.to_string(), "browser");
        assert!("spaceship".parse::<ToolCategory>().is_err());
    }

    #[test]
    fn test_category_order_is_declaration_order() {
        assert!(ToolCategory::Data < ToolCategory::Communication);
        assert!(ToolCategory::Browser < ToolCategory::General);
    }

    #[test]
    fn test_tool_definition_builder() {
        let tool = ToolDefinition::new("send_slack", "Post a message", ToolCategory::Communication)
            .with_input(ToolInput::new("channel", "Target channel", true))
            .with_input(ToolInput::new("text", "Message body", true))
            .with_tag("chat")
            .with_dependency("lookup_channel")
            .with_version("2.1.0");

        assert_eq!(tool.inputs.len(), 2);
        assert!(tool.input("channel").unwrap().required);
        assert!(tool.has_tag("chat"));
        assert_eq!(tool.dependencies, vec!["lookup_channel"]);
        assert_eq!(tool.version, "2.1.0");
        assert_eq!(tool.source, INLINE_SOURCE);
    }

    #[test]
    fn test_matches_query_is_case_insensitive() {
        let tool = ToolDefinition::new("fetch_metrics", "Read Prometheus series", ToolCategory::Monitoring);
        assert!(tool.matches_query("METRICS"));
        assert!(tool.matches_query("prometheus"));
        assert!(!tool.matches_query("grafana"));
    }

    #[test]
    fn test_tool_input_serde_uses_type_key() {
        let input: ToolInput =
            serde_json::from_str(r#"{"name": "count", "type": "number", "default": 3}"#).unwrap();
        assert_eq!(input.input_type, "number");
        assert!(!input.required);
        assert_eq!(input.default, Some(serde_json::json!(3)));
    }
}
