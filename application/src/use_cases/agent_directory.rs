//! Agent directory and router.
//!
//! Holds execution profiles in registration order and ranks them against a
//! plan. Registration order is the tie-breaker everywhere: of two equally
//! scored profiles, the one registered first wins.

use crate::ports::tool_catalog::ToolCatalogPort;
use mender_domain::{AgentProfile, Plan, PlanRequirements};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during routing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoutingError {
    #[error("No agent profiles registered")]
    NoAgents,

    #[error("Every registered agent profile is excluded")]
    AllExcluded,
}

/// A profile together with its score for one plan.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedAgent {
    pub profile: AgentProfile,
    pub score: f64,
}

/// Registry of execution profiles.
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    profiles: Vec<AgentProfile>,
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a profile. A profile with the same name is replaced in place,
    /// keeping its registration position.
    pub fn register(&mut self, profile: AgentProfile) -> Option<AgentProfile> {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => {
                debug!(agent = %profile.name, "Replacing agent profile");
                Some(std::mem::replace(existing, profile))
            }
            None => {
                debug!(agent = %profile.name, domain = %profile.domain, "Registered agent profile");
                self.profiles.push(profile);
                None
            }
        }
    }

    pub fn unregister(&mut self, name: &str) -> Option<AgentProfile> {
        let index = self.profiles.iter().position(|p| p.name == name)?;
        debug!(agent = name, "Unregistered agent profile");
        Some(self.profiles.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&AgentProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn profiles(&self) -> &[AgentProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Requirements of a plan, with categories looked up in the catalog.
    pub fn requirements(plan: &Plan, catalog: &dyn ToolCatalogPort) -> PlanRequirements {
        PlanRequirements::from_plan(plan, |tool| catalog.category_of(tool))
    }

    /// Every profile with its score, best first (stable for ties).
    pub fn rank(&self, requirements: &PlanRequirements) -> Vec<RankedAgent> {
        let mut ranked: Vec<RankedAgent> = self
            .profiles
            .iter()
            .map(|p| RankedAgent {
                score: p.score(requirements),
                profile: p.clone(),
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Highest-scoring profile whose name is not excluded.
    pub fn find_best_agent(
        &self,
        requirements: &PlanRequirements,
        exclude: &HashSet<String>,
    ) -> Option<RankedAgent> {
        let mut best: Option<(&AgentProfile, f64)> = None;
        for profile in self.profiles.iter().filter(|p| !exclude.contains(&p.name)) {
            let score = profile.score(requirements);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((profile, score));
            }
        }
        best.map(|(profile, score)| RankedAgent {
            profile: profile.clone(),
            score,
        })
    }

    /// Best profile plus up to `fallback_count` next-best, in non-increasing
    /// score order without duplicates.
    pub fn route(
        &self,
        requirements: &PlanRequirements,
        fallback_count: usize,
    ) -> Result<Vec<RankedAgent>, RoutingError> {
        if self.profiles.is_empty() {
            return Err(RoutingError::NoAgents);
        }

        let mut exclude = HashSet::new();
        let mut route = Vec::with_capacity(fallback_count + 1);
        while route.len() <= fallback_count {
            let Some(next) = self.find_best_agent(requirements, &exclude) else {
                break;
            };
            exclude.insert(next.profile.name.clone());
            route.push(next);
        }

        match route.first() {
            Some(primary) => {
                info!(
                    agent = %primary.profile.name,
                    score = primary.score,
                    fallbacks = route.len() - 1,
                    "Routed plan"
                );
                if primary.profile.coverage(requirements) < 1.0 {
                    warn!(
                        agent = %primary.profile.name,
                        "Best agent profile lacks some required tools"
                    );
                }
                Ok(route)
            }
            None => Err(RoutingError::AllExcluded),
        }
    }

    /// Profiles holding `capability` with at least `min_confidence`.
    pub fn find_agents_with_capability(
        &self,
        capability: &str,
        min_confidence: f64,
    ) -> Vec<&AgentProfile> {
        self.profiles
            .iter()
            .filter(|p| {
                p.capability_confidence(capability)
                    .is_some_and(|c| c >= min_confidence)
            })
            .collect()
    }
}
