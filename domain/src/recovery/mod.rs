//! Recovery domain module
//!
//! The fixed taxonomy of run-time failures and the rules for healing them.
//!
//! ```text
//! ToolError ──classify──▶ ErrorCategory ──lookup──▶ RecoveryStrategy ──▶ RecoveryAction
//!                          (first pattern            (plan-scoped,
//!                           match wins)               then defaults)
//! ```

pub mod category;
pub mod strategy;

pub use category::{ErrorCategory, ErrorClassifier, extract_missing_module};
pub use strategy::{
    AlertSeverity, RecoveryAction, RecoveryStrategy, StrategyTable, default_strategies,
};
