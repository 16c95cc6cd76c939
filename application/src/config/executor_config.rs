//! Executor parameters: attempt loop control.
//!
//! [`ExecutorConfig`] groups the process-wide defaults of the self-healing
//! executor. Steps and tools override the retry ceiling and timeout; plans
//! override individual recovery strategies.
//!
//! | Parameter | Default | Overridden by |
//! |-----------|---------|---------------|
//! | `max_retries` | 3 | step `max_retries`, then tool `max_retries` |
//! | `default_timeout` | 300s | step `timeout_seconds`, then tool `timeout_seconds` |
//! | `auth_refresh_delay` | 1s | - |
//! | `strategies` | built-in table | plan `error_handlers` |

use mender_domain::{ErrorCategory, RecoveryAction, RecoveryStrategy, default_strategies};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Retry ceiling when neither step nor tool sets one.
    pub max_retries: u32,
    /// Per-attempt timeout when neither step nor tool sets one.
    pub default_timeout: Duration,
    /// Pause taken by the `refresh_auth` action.
    pub auth_refresh_delay: Duration,
    /// Process-wide recovery strategies, consulted after plan-scoped ones.
    pub strategies: Vec<RecoveryStrategy>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            default_timeout: Duration::from_secs(300),
            auth_refresh_delay: Duration::from_millis(1000),
            strategies: default_strategies(),
        }
    }
}

impl ExecutorConfig {
    // ==================== Builder Methods ====================

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_auth_refresh_delay(mut self, delay: Duration) -> Self {
        self.auth_refresh_delay = delay;
        self
    }

    /// Replace the strategy for the strategy's category, or add it.
    pub fn with_strategy(mut self, strategy: RecoveryStrategy) -> Self {
        match self
            .strategies
            .iter_mut()
            .find(|s| s.category == strategy.category)
        {
            Some(existing) => *existing = strategy,
            None => self.strategies.push(strategy),
        }
        self
    }

    /// Drop the strategy for a category so its failures are not recovered.
    pub fn without_strategy(mut self, category: ErrorCategory) -> Self {
        self.strategies.retain(|s| s.category != category);
        self
    }

    /// Set the factor of every `increase_timeout` strategy.
    pub fn with_timeout_growth_factor(mut self, factor: f64) -> Self {
        for strategy in &mut self.strategies {
            if let RecoveryAction::IncreaseTimeout { factor: f } = &mut strategy.action {
                *f = factor;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.default_timeout, Duration::from_secs(300));
        assert_eq!(config.auth_refresh_delay, Duration::from_secs(1));
        assert!(config.strategies.iter().any(|s| s.category == ErrorCategory::Network));
    }

    #[test]
    fn test_with_strategy_replaces_same_category() {
        let before = ExecutorConfig::default().strategies.len();
        let config = ExecutorConfig::default().with_strategy(RecoveryStrategy::new(
            ErrorCategory::Network,
            RecoveryAction::Retry,
            7,
        ));

        assert_eq!(config.strategies.len(), before);
        let network = config
            .strategies
            .iter()
            .find(|s| s.category == ErrorCategory::Network)
            .unwrap();
        assert_eq!(network.max_attempts, 7);
    }

    #[test]
    fn test_with_strategy_adds_new_category() {
        let config = ExecutorConfig::default().with_strategy(RecoveryStrategy::new(
            ErrorCategory::Validation,
            RecoveryAction::Skip,
            1,
        ));
        assert!(config.strategies.iter().any(|s| s.category == ErrorCategory::Validation));
    }

    #[test]
    fn test_timeout_growth_factor() {
        let config = ExecutorConfig::default().with_timeout_growth_factor(3.0);
        let timeout = config
            .strategies
            .iter()
            .find(|s| s.category == ErrorCategory::Timeout)
            .unwrap();
        assert_eq!(timeout.action, RecoveryAction::IncreaseTimeout { factor: 3.0 });
    }
}
