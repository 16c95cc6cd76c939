//! Agent profile entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::tool::entities::ToolCategory;

/// Confidence assigned to a capability derived from tool access.
pub const TOOL_CAPABILITY_CONFIDENCE: f64 = 1.0;
/// Confidence assigned to the capability derived from the domain.
pub const DOMAIN_CAPABILITY_CONFIDENCE: f64 = 0.9;

/// Domain specialization of a profile.
///
/// One variant per tool category, with `Generic` standing in for
/// [`ToolCategory::General`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentDomain {
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
    Generic,
}

impl AgentDomain {
    pub fn as_str(&self) -> &str {
        match self {
            AgentDomain::Data => "data",
            AgentDomain::Communication => "communication",
            AgentDomain::Deployment => "deployment",
            AgentDomain::Monitoring => "monitoring",
            AgentDomain::Storage => "storage",
            AgentDomain::Integration => "integration",
            AgentDomain::Workspace => "workspace",
            AgentDomain::Security => "security",
            AgentDomain::Browser => "browser",
            AgentDomain::Generic => "generic",
        }
    }

    /// The domain a tool category belongs to.
    pub fn for_category(category: ToolCategory) -> Self {
        match category {
            ToolCategory::Data => AgentDomain::Data,
            ToolCategory::Communication => AgentDomain::Communication,
            ToolCategory::Deployment => AgentDomain::Deployment,
            ToolCategory::Monitoring => AgentDomain::Monitoring,
            ToolCategory::Storage => AgentDomain::Storage,
            ToolCategory::Integration => AgentDomain::Integration,
            ToolCategory::Workspace => AgentDomain::Workspace,
            ToolCategory::Security => AgentDomain::Security,
            ToolCategory::Browser => AgentDomain::Browser,
            ToolCategory::General => AgentDomain::Generic,
        }
    }
}

impl std::fmt::Display for AgentDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AgentDomain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "generic" | "general" => Ok(AgentDomain::Generic),
            other => other
                .parse::<ToolCategory>()
                .map(AgentDomain::for_category)
                .map_err(|_| format!("unknown agent domain '{}'", s)),
        }
    }
}

/// Compute tier a profile runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeTier {
    Light,
    #[default]
    Standard,
    Heavy,
}

impl ComputeTier {
    pub fn as_str(&self) -> &str {
        match self {
            ComputeTier::Light => "light",
            ComputeTier::Standard => "standard",
            ComputeTier::Heavy => "heavy",
        }
    }
}

impl std::str::FromStr for ComputeTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(ComputeTier::Light),
            "standard" => Ok(ComputeTier::Standard),
            "heavy" => Ok(ComputeTier::Heavy),
            _ => Err(format!("unknown compute tier '{}'", s)),
        }
    }
}

/// A named skill with a confidence in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub confidence: f64,
}

impl Capability {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Named bundle of tool access, domain specialization and budgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: AgentDomain,
    /// Accessible tool names
    #[serde(default)]
    pub tools: BTreeSet<String>,
    /// Declared capabilities; derived ones come from tools and domain
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub compute_tier: ComputeTier,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_per_task_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens_per_task: Option<u64>,
}

fn default_max_concurrency() -> u32 {
    1
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, domain: AgentDomain) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            domain,
            tools: BTreeSet::new(),
            capabilities: Vec::new(),
            compute_tier: ComputeTier::default(),
            max_concurrency: default_max_concurrency(),
            memory_limit_mb: None,
            max_cost_per_task_usd: None,
            max_tokens_per_task: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.insert(tool.into());
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_compute_tier(mut self, tier: ComputeTier) -> Self {
        self.compute_tier = tier;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: u32) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_memory_limit_mb(mut self, megabytes: u64) -> Self {
        self.memory_limit_mb = Some(megabytes);
        self
    }

    pub fn with_cost_ceiling(mut self, usd: f64) -> Self {
        self.max_cost_per_task_usd = Some(usd);
        self
    }

    pub fn with_token_ceiling(mut self, tokens: u64) -> Self {
        self.max_tokens_per_task = Some(tokens);
        self
    }

    pub fn has_tool(&self, tool: &str) -> bool {
        self.tools.contains(tool)
    }

    /// Declared capabilities plus those derived from tool access and domain.
    ///
    /// A declared capability overrides a derived one of the same name.
    pub fn all_capabilities(&self) -> Vec<Capability> {
        let mut all = self.capabilities.clone();
        let derived = self
            .tools
            .iter()
            .map(|t| Capability::new(t.clone(), TOOL_CAPABILITY_CONFIDENCE))
            .chain(std::iter::once(Capability::new(
                self.domain.as_str(),
                DOMAIN_CAPABILITY_CONFIDENCE,
            )));
        for capability in derived {
            if !all.iter().any(|c| c.name == capability.name) {
                all.push(capability);
            }
        }
        all
    }

    pub fn capability_confidence(&self, name: &str) -> Option<f64> {
        self.all_capabilities()
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_domain_for_category() {
        assert_eq!(AgentDomain::for_category(ToolCategory::Deployment), AgentDomain::Deployment);
        assert_eq!(AgentDomain::for_category(ToolCategory::General), AgentDomain::Generic);
        assert_eq!("general".parse::<AgentDomain>(), Ok(AgentDomain::Generic));
        assert_eq!("Security".parse::<AgentDomain>(), Ok(AgentDomain::Security));
        assert!("cooking".parse::<AgentDomain>().is_err());
    }

    #[test]
    fn test_derived_capabilities() {
        let profile = AgentProfile::new("ops", AgentDomain::Deployment)
            .with_tools(["deploy_service", "rollback"])
            .with_capability(Capability::new("rollback", 0.4));

        assert_eq!(profile.capability_confidence("deploy_service"), Some(1.0));
        assert_eq!(profile.capability_confidence("deployment"), Some(0.9));
        assert_eq!(profile.capability_confidence("rollback"), Some(0.4));
        assert_eq!(profile.capability_confidence("painting"), None);
    }

    #[test]
    fn test_capability_confidence_is_clamped() {
        assert_eq!(Capability::new("x", 1.7).confidence, 1.0);
        assert_eq!(Capability::new("x", -2.0).confidence, 0.0);
    }

    #[test]
    fn test_profile_document_defaults() {
        let profile: AgentProfile = serde_json::from_value(json!({
            "name": "helper",
            "tools": ["echo"]
        }))
        .unwrap();

        assert_eq!(profile.domain, AgentDomain::Generic);
        assert_eq!(profile.compute_tier, ComputeTier::Standard);
        assert_eq!(profile.max_concurrency, 1);
        assert!(profile.has_tool("echo"));
    }
}
