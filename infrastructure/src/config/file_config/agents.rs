//! Agent profiles from TOML (`[[agents]]` entries)

use super::issue::{ConfigIssue, ConfigIssueCode};
use mender_domain::{AgentDomain, AgentProfile, Capability, ComputeTier};
use serde::{Deserialize, Serialize};

/// Raw agent profile from TOML
///
/// # Example
///
/// ```toml
/// [[agents]]
/// name = "release-bot"
/// domain = "deployment"
/// tools = ["deploy_service", "run_command"]
/// compute_tier = "heavy"
/// max_cost_per_task_usd = 2.5
///
/// [[agents.capabilities]]
/// name = "kubernetes"
/// confidence = 0.8
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub name: String,
    pub description: String,
    /// Domain name; unknown values fall back to `generic`
    pub domain: String,
    pub tools: Vec<String>,
    pub capabilities: Vec<Capability>,
    /// "light", "standard" or "heavy"
    pub compute_tier: String,
    pub max_concurrency: u32,
    pub memory_limit_mb: Option<u64>,
    pub max_cost_per_task_usd: Option<f64>,
    pub max_tokens_per_task: Option<u64>,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            domain: "generic".to_string(),
            tools: Vec::new(),
            capabilities: Vec::new(),
            compute_tier: "standard".to_string(),
            max_concurrency: 1,
            memory_limit_mb: None,
            max_cost_per_task_usd: None,
            max_tokens_per_task: None,
        }
    }
}

impl FileAgentConfig {
    /// Parse the domain, returning warnings on failure.
    pub fn parse_domain(&self) -> (AgentDomain, Vec<ConfigIssue>) {
        match self.domain.parse::<AgentDomain>() {
            Ok(domain) => (domain, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: format!("agents.{}.domain", self.name),
                        value: self.domain.clone(),
                        valid_values: domain_names(),
                    },
                    format!(
                        "agents.{}.domain: unknown value '{}', falling back to 'generic'",
                        self.name, self.domain
                    ),
                );
                (AgentDomain::Generic, vec![issue])
            }
        }
    }

    /// Parse the compute tier, returning warnings on failure.
    pub fn parse_compute_tier(&self) -> (ComputeTier, Vec<ConfigIssue>) {
        match self.compute_tier.parse::<ComputeTier>() {
            Ok(tier) => (tier, vec![]),
            Err(_) => {
                let issue = ConfigIssue::warning(
                    ConfigIssueCode::InvalidEnumValue {
                        field: format!("agents.{}.compute_tier", self.name),
                        value: self.compute_tier.clone(),
                        valid_values: vec![
                            "light".to_string(),
                            "standard".to_string(),
                            "heavy".to_string(),
                        ],
                    },
                    format!(
                        "agents.{}.compute_tier: unknown value '{}', falling back to 'standard'",
                        self.name, self.compute_tier
                    ),
                );
                (ComputeTier::Standard, vec![issue])
            }
        }
    }

    /// Build the profile, collecting enum fallbacks.
    pub fn to_profile(&self) -> (AgentProfile, Vec<ConfigIssue>) {
        let (domain, mut issues) = self.parse_domain();
        let (tier, tier_issues) = self.parse_compute_tier();
        issues.extend(tier_issues);

        let mut profile = AgentProfile::new(&self.name, domain)
            .with_description(&self.description)
            .with_tools(&self.tools)
            .with_compute_tier(tier)
            .with_max_concurrency(self.max_concurrency);
        for capability in &self.capabilities {
            profile = profile.with_capability(Capability::new(
                &capability.name,
                capability.confidence,
            ));
        }
        if let Some(mb) = self.memory_limit_mb {
            profile = profile.with_memory_limit_mb(mb);
        }
        if let Some(usd) = self.max_cost_per_task_usd {
            profile = profile.with_cost_ceiling(usd);
        }
        if let Some(tokens) = self.max_tokens_per_task {
            profile = profile.with_token_ceiling(tokens);
        }

        (profile, issues)
    }
}

fn domain_names() -> Vec<String> {
    mender_domain::ToolCategory::ALL
        .iter()
        .map(|c| AgentDomain::for_category(*c).as_str().to_string())
        .collect()
}
