//! Domain layer for mender
//!
//! This crate contains the core vocabulary of the workflow engine: tools,
//! plans, the recovery taxonomy, agent profiles and execution records.
//! It performs no I/O and has no dependencies on infrastructure or
//! presentation concerns.
//!
//! # Core Concepts
//!
//! ## Plans
//!
//! A [`Plan`] is an ordered list of [`PlanStep`]s, each invoking one catalog
//! tool. Steps pass data forward with `$`-references (`$prev`, `$inputs.x`,
//! `$<step>.field`) and may be gated by a condition.
//!
//! ## Self-healing
//!
//! Run-time tool failures ([`ToolError`]) are classified into a fixed set of
//! [`ErrorCategory`]s. Each category maps to one [`RecoveryStrategy`], so a
//! run can retry, back off, install a dependency or stop with a suggestion
//! without an operator.
//!
//! ## Routing
//!
//! [`AgentProfile`]s bundle tool access with a domain specialization; the
//! scoring function ranks them against a plan's [`PlanRequirements`].

pub mod agent;
pub mod core;
pub mod execution;
pub mod plan;
pub mod recovery;
pub mod tool;

// Re-export commonly used types
pub use agent::{AgentDomain, AgentProfile, Capability, ComputeTier, PlanRequirements};
pub use core::duration::{MAX_DURATION_SECONDS, is_valid_seconds, saturating_duration};
pub use core::error::DomainError;
pub use execution::{
    ExecutionContext, ExecutionResult, ExecutionStatus, RecoveryRecord, StepResult, StepStatus,
};
pub use plan::{
    InputSpec, OnError, Plan, PlanFormat, PlanIssue, PlanIssueCode, PlanLibrary, PlanStep,
    Severity, compile, parse_plan,
};
pub use recovery::{
    AlertSeverity, ErrorCategory, ErrorClassifier, RecoveryAction, RecoveryStrategy,
    StrategyTable, default_strategies,
};
pub use tool::{
    DefaultToolValidator, Tool, ToolArgs, ToolCategory, ToolDefinition, ToolError, ToolHandler,
    ToolInput, ToolOutput, ToolResponse, ToolValidator, Usage,
};
