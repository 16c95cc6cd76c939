//! Execution domain module
//!
//! Per-run state ([`ExecutionContext`]) and the records a run produces
//! ([`StepResult`], [`ExecutionResult`]). The state machine that drives a
//! run lives in the application layer.

pub mod context;
pub mod entities;

pub use context::ExecutionContext;
pub use entities::{
    ExecutionResult, ExecutionStatus, RecoveryRecord, StepResult, StepStatus,
};
