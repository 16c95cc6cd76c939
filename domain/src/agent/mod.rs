//! Agent domain module
//!
//! Execution profiles and the scoring function the router ranks them with.

pub mod entities;
pub mod scoring;

pub use entities::{AgentDomain, AgentProfile, Capability, ComputeTier};
pub use scoring::{PlanRequirements, dominant_category};
