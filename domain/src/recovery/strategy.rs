//! Recovery strategies: one error category → one corrective action.
//!
//! [`RecoveryAction`] is a closed set. The executor dispatches it with a
//! single exhaustive `match`, so adding an action is a compile-time-checked
//! change. On the wire a strategy is the flat `error_handlers` entry of the
//! structured plan document:
//!
//! ```json
//! { "error_type": "network", "action": "retry_with_backoff", "max_attempts": 3,
//!   "backoff_seconds": 1.0, "backoff_multiplier": 2.0 }
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::category::ErrorCategory;
use crate::core::duration::{MAX_DURATION_SECONDS, saturating_duration};
use crate::core::error::DomainError;

const DEFAULT_BACKOFF_SECONDS: f64 = 1.0;
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Severity attached to an alert action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Error => "error",
            AlertSeverity::Critical => "critical",
        }
    }
}

/// Corrective action applied after a classified failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// Loop immediately
    Retry,
    /// Wait `base * multiplier^(attempt-1)` seconds, then retry
    RetryWithBackoff { base_seconds: f64, multiplier: f64 },
    /// Install the module named in the error text, then retry
    InstallDependency,
    /// Pause briefly so an external credential refresh can land, then retry
    RefreshAuth,
    /// Multiply the per-attempt timeout, then retry
    IncreaseTimeout { factor: f64 },
    /// Stop and surface an alternative tool to the caller
    Fallback { tool: Option<String> },
    /// Stop and raise an alert
    Alert { severity: AlertSeverity },
    /// Stop and hand over to an operator
    Escalate,
    /// Stop; the step's `on_error` decides
    Skip,
    /// Stop; the step's `on_error` decides
    Abort,
}

impl RecoveryAction {
    pub fn as_str(&self) -> &str {
        match self {
            RecoveryAction::Retry => "retry",
            RecoveryAction::RetryWithBackoff { .. } => "retry_with_backoff",
            RecoveryAction::InstallDependency => "install_dependency",
            RecoveryAction::RefreshAuth => "refresh_auth",
            RecoveryAction::IncreaseTimeout { .. } => "increase_timeout",
            RecoveryAction::Fallback { .. } => "fallback",
            RecoveryAction::Alert { .. } => "alert",
            RecoveryAction::Escalate => "escalate",
            RecoveryAction::Skip => "skip",
            RecoveryAction::Abort => "abort",
        }
    }

    /// Whether the action ends in another attempt of the same step.
    pub fn retries(&self) -> bool {
        matches!(
            self,
            RecoveryAction::Retry
                | RecoveryAction::RetryWithBackoff { .. }
                | RecoveryAction::InstallDependency
                | RecoveryAction::RefreshAuth
                | RecoveryAction::IncreaseTimeout { .. }
        )
    }

    /// Delay before the next attempt after failed attempt number `attempt` (1-based).
    pub fn backoff_delay(&self, attempt: u32) -> Option<Duration> {
        match self {
            RecoveryAction::RetryWithBackoff {
                base_seconds,
                multiplier,
            } => {
                let exponent = attempt.saturating_sub(1) as i32;
                Some(saturating_duration(base_seconds * multiplier.powi(exponent)))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps one error category to one recovery action with a retry bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StrategyDocument", into = "StrategyDocument")]
pub struct RecoveryStrategy {
    pub category: ErrorCategory,
    pub action: RecoveryAction,
    /// Attempts allowed before the strategy counts as exhausted
    pub max_attempts: u32,
}

impl RecoveryStrategy {
    pub fn new(category: ErrorCategory, action: RecoveryAction, max_attempts: u32) -> Self {
        Self {
            category,
            action,
            max_attempts,
        }
    }

    /// Describe the first out-of-range numeric parameter of the action.
    pub fn parameter_problem(&self) -> Option<String> {
        match &self.action {
            RecoveryAction::RetryWithBackoff {
                base_seconds,
                multiplier,
            } => {
                if !(base_seconds.is_finite()
                    && *base_seconds >= 0.0
                    && *base_seconds <= MAX_DURATION_SECONDS)
                {
                    Some(format!(
                        "backoff_seconds must be between 0 and {} (got {})",
                        MAX_DURATION_SECONDS, base_seconds
                    ))
                } else if !(multiplier.is_finite() && *multiplier > 0.0) {
                    Some(format!(
                        "backoff_multiplier must be positive and finite (got {})",
                        multiplier
                    ))
                } else {
                    None
                }
            }
            RecoveryAction::IncreaseTimeout { factor } => {
                (!(factor.is_finite() && *factor >= 1.0)).then(|| {
                    format!("timeout factor must be finite and at least 1.0 (got {})", factor)
                })
            }
            _ => None,
        }
    }

    /// Whether failed attempt number `attempt` (1-based) used up this strategy.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

/// Flat wire form of a [`RecoveryStrategy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StrategyDocument {
    error_type: String,
    action: String,
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default = "default_backoff_seconds")]
    backoff_seconds: f64,
    #[serde(default = "default_backoff_multiplier")]
    backoff_multiplier: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fallback_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alert_severity: Option<AlertSeverity>,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_seconds() -> f64 {
    DEFAULT_BACKOFF_SECONDS
}

fn default_backoff_multiplier() -> f64 {
    DEFAULT_BACKOFF_MULTIPLIER
}

impl TryFrom<StrategyDocument> for RecoveryStrategy {
    type Error = DomainError;

    fn try_from(doc: StrategyDocument) -> Result<Self, Self::Error> {
        let category = doc
            .error_type
            .parse::<ErrorCategory>()
            .map_err(DomainError::InvalidStrategy)?;

        let action = match doc.action.trim().to_lowercase().replace('-', "_").as_str() {
            "retry" => RecoveryAction::Retry,
            "retry_with_backoff" | "backoff" => RecoveryAction::RetryWithBackoff {
                base_seconds: doc.backoff_seconds,
                multiplier: doc.backoff_multiplier,
            },
            "install_dependency" => RecoveryAction::InstallDependency,
            "refresh_auth" => RecoveryAction::RefreshAuth,
            "increase_timeout" => RecoveryAction::IncreaseTimeout {
                factor: doc.backoff_multiplier,
            },
            "fallback" => RecoveryAction::Fallback {
                tool: doc.fallback_tool,
            },
            "alert" => RecoveryAction::Alert {
                severity: doc.alert_severity.unwrap_or_default(),
            },
            "escalate" => RecoveryAction::Escalate,
            "skip" => RecoveryAction::Skip,
            "abort" => RecoveryAction::Abort,
            other => {
                return Err(DomainError::InvalidStrategy(format!(
                    "unknown recovery action '{}'",
                    other
                )));
            }
        };

        let strategy = RecoveryStrategy::new(category, action, doc.max_attempts);
        match strategy.parameter_problem() {
            Some(problem) => Err(DomainError::InvalidStrategy(format!(
                "{} handler: {}",
                strategy.category, problem
            ))),
            None => Ok(strategy),
        }
    }
}

impl From<RecoveryStrategy> for StrategyDocument {
    fn from(strategy: RecoveryStrategy) -> Self {
        let mut doc = StrategyDocument {
            error_type: strategy.category.as_str().to_string(),
            action: strategy.action.as_str().to_string(),
            max_attempts: strategy.max_attempts,
            backoff_seconds: DEFAULT_BACKOFF_SECONDS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            fallback_tool: None,
            alert_severity: None,
        };
        match strategy.action {
            RecoveryAction::RetryWithBackoff {
                base_seconds,
                multiplier,
            } => {
                doc.backoff_seconds = base_seconds;
                doc.backoff_multiplier = multiplier;
            }
            RecoveryAction::IncreaseTimeout { factor } => doc.backoff_multiplier = factor,
            RecoveryAction::Fallback { tool } => doc.fallback_tool = tool,
            RecoveryAction::Alert { severity } => doc.alert_severity = Some(severity),
            RecoveryAction::Retry
            | RecoveryAction::InstallDependency
            | RecoveryAction::RefreshAuth
            | RecoveryAction::Escalate
            | RecoveryAction::Skip
            | RecoveryAction::Abort => {}
        }
        doc
    }
}

/// Built-in strategies used when neither the plan nor the host overrides a category.
///
/// Validation and syntax failures have no default: retrying the same input
/// cannot fix them, so they fail on the first attempt.
pub fn default_strategies() -> Vec<RecoveryStrategy> {
    vec![
        RecoveryStrategy::new(
            ErrorCategory::Network,
            RecoveryAction::RetryWithBackoff {
                base_seconds: 1.0,
                multiplier: 2.0,
            },
            3,
        ),
        RecoveryStrategy::new(ErrorCategory::Authentication, RecoveryAction::RefreshAuth, 2),
        RecoveryStrategy::new(
            ErrorCategory::RateLimit,
            RecoveryAction::RetryWithBackoff {
                base_seconds: 5.0,
                multiplier: 2.0,
            },
            4,
        ),
        RecoveryStrategy::new(ErrorCategory::Dependency, RecoveryAction::InstallDependency, 2),
        RecoveryStrategy::new(
            ErrorCategory::ResourceNotFound,
            RecoveryAction::Fallback { tool: None },
            1,
        ),
        RecoveryStrategy::new(ErrorCategory::Permission, RecoveryAction::Escalate, 1),
        RecoveryStrategy::new(
            ErrorCategory::Timeout,
            RecoveryAction::IncreaseTimeout { factor: 2.0 },
            3,
        ),
        RecoveryStrategy::new(
            ErrorCategory::Unknown,
            RecoveryAction::Alert {
                severity: AlertSeverity::Warning,
            },
            1,
        ),
    ]
}

/// Strategy lookup: plan-scoped strategies first, then process defaults.
#[derive(Debug, Clone)]
pub struct StrategyTable {
    plan: Vec<RecoveryStrategy>,
    defaults: Vec<RecoveryStrategy>,
}

impl StrategyTable {
    pub fn new(defaults: Vec<RecoveryStrategy>) -> Self {
        Self {
            plan: Vec::new(),
            defaults,
        }
    }

    pub fn with_plan_strategies(mut self, strategies: &[RecoveryStrategy]) -> Self {
        self.plan = strategies.to_vec();
        self
    }

    pub fn lookup(&self, category: ErrorCategory) -> Option<&RecoveryStrategy> {
        if !category.is_recoverable() {
            return None;
        }
        self.plan
            .iter()
            .chain(self.defaults.iter())
            .find(|s| s.category == category)
    }
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self::new(default_strategies())
    }
}
