//! Profile-against-plan scoring.
//!
//! | Component | Weight | Value |
//! |-----------|--------|-------|
//! | Tool coverage | 0.7 | \|required ∩ available\| / \|required\| (1.0 when nothing is required) |
//! | Domain fit | 0.3 | 1.0 matching domain, 0.5 generic profile, 0.2 otherwise |
//!
//! The domain is compared against the plan's dominant category: the most
//! frequent category among its required tools, ties going to the category
//! declared first in [`ToolCategory`].

use std::collections::{BTreeMap, BTreeSet};

use super::entities::{AgentDomain, AgentProfile};
use crate::plan::entities::Plan;
use crate::tool::entities::ToolCategory;

pub const COVERAGE_WEIGHT: f64 = 0.7;
pub const DOMAIN_WEIGHT: f64 = 0.3;

const DOMAIN_MATCH: f64 = 1.0;
const DOMAIN_GENERIC: f64 = 0.5;
const DOMAIN_MISMATCH: f64 = 0.2;

/// What a plan needs from a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRequirements {
    pub tools: BTreeSet<String>,
    pub dominant_category: ToolCategory,
}

impl PlanRequirements {
    /// Derive requirements from a plan, looking tool categories up with
    /// `category_of`. Tools it does not know count for coverage only.
    pub fn from_plan(plan: &Plan, category_of: impl Fn(&str) -> Option<ToolCategory>) -> Self {
        let tools = plan.required_tools();
        let categories: Vec<ToolCategory> = tools.iter().filter_map(|t| category_of(t)).collect();
        Self {
            dominant_category: dominant_category(&categories),
            tools,
        }
    }
}

/// Most frequent category; ties go to declaration order, none → `General`.
pub fn dominant_category(categories: &[ToolCategory]) -> ToolCategory {
    let mut counts: BTreeMap<ToolCategory, usize> = BTreeMap::new();
    for category in categories {
        *counts.entry(*category).or_default() += 1;
    }
    // BTreeMap iterates in declaration order; keep the first maximum.
    counts
        .into_iter()
        .fold(None::<(ToolCategory, usize)>, |best, (category, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((category, count)),
        })
        .map(|(category, _)| category)
        .unwrap_or_default()
}

impl AgentProfile {
    /// Fraction of required tools this profile can access.
    pub fn coverage(&self, requirements: &PlanRequirements) -> f64 {
        if requirements.tools.is_empty() {
            return 1.0;
        }
        let covered = requirements.tools.iter().filter(|t| self.has_tool(t)).count();
        covered as f64 / requirements.tools.len() as f64
    }

    pub fn domain_score(&self, dominant: ToolCategory) -> f64 {
        if AgentDomain::for_category(dominant) == self.domain {
            DOMAIN_MATCH
        } else if self.domain == AgentDomain::Generic {
            DOMAIN_GENERIC
        } else {
            DOMAIN_MISMATCH
        }
    }

    /// Weighted score in [0, 1].
    pub fn score(&self, requirements: &PlanRequirements) -> f64 {
        let score = COVERAGE_WEIGHT * self.coverage(requirements)
            + DOMAIN_WEIGHT * self.domain_score(requirements.dominant_category);
        score.clamp(0.0, 1.0)
    }
}
