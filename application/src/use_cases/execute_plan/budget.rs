//! Run budgets: money, tokens and wall-clock time.
//!
//! The monetary ceiling is the tighter of the plan's `cost_budget_usd` and
//! the profile's `max_cost_per_task_usd`; tokens come from the profile; the
//! deadline from the plan's `timeout_seconds`. Overruns are never retried.

use mender_domain::{AgentProfile, Plan, Usage, saturating_duration};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(super) struct RunBudget {
    cost_usd: Option<f64>,
    tokens: Option<u64>,
    deadline: Option<(Instant, Duration)>,
}

impl RunBudget {
    pub fn for_run(plan: &Plan, profile: Option<&AgentProfile>) -> Self {
        let profile_cost = profile.and_then(|p| p.max_cost_per_task_usd);
        let cost_usd = match (plan.cost_budget_usd, profile_cost) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        let deadline = plan
            .timeout_seconds
            .filter(|s| *s > 0.0)
            .map(|s| {
                let limit = saturating_duration(s);
                (Instant::now() + limit, limit)
            });

        Self {
            cost_usd,
            tokens: profile.and_then(|p| p.max_tokens_per_task),
            deadline,
        }
    }

    /// Describe the overrun, if running totals exceed a ceiling.
    pub fn check_usage(&self, usage: Usage) -> Option<String> {
        if let Some(limit) = self.cost_usd
            && usage.cost_usd > limit
        {
            return Some(format!(
                "cost ${:.4} exceeds budget ${:.4}",
                usage.cost_usd, limit
            ));
        }
        if let Some(limit) = self.tokens
            && usage.tokens > limit
        {
            return Some(format!("{} tokens exceed budget of {}", usage.tokens, limit));
        }
        None
    }

    /// Describe the overrun, if the wall-clock deadline has passed.
    pub fn check_deadline(&self) -> Option<String> {
        let (deadline, limit) = self.deadline?;
        (Instant::now() >= deadline)
            .then(|| format!("run exceeded its {:.1}s time budget", limit.as_secs_f64()))
    }

    /// Shrink a per-attempt timeout to the time left before the deadline.
    pub fn cap_timeout(&self, timeout: Duration) -> Duration {
        match self.deadline {
            Some((deadline, _)) => timeout.min(deadline.saturating_duration_since(Instant::now())),
            None => timeout,
        }
    }
}
