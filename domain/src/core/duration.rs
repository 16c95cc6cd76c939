//! Float seconds from plan documents as bounded [`Duration`]s.

use std::time::Duration;

/// Longest timeout, deadline or backoff a plan can express (30 days).
pub const MAX_DURATION_SECONDS: f64 = 30.0 * 24.0 * 60.0 * 60.0;

/// Whether `seconds` is a positive, finite value within [`MAX_DURATION_SECONDS`].
pub fn is_valid_seconds(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0 && seconds <= MAX_DURATION_SECONDS
}

/// Convert `seconds`, clamped into `[0, MAX_DURATION_SECONDS]`.
///
/// NaN and negative values become zero; infinities and overlong values
/// become the ceiling.
pub fn saturating_duration(seconds: f64) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }
    let ceiling = Duration::from_secs(MAX_DURATION_SECONDS as u64);
    Duration::try_from_secs_f64(seconds.min(MAX_DURATION_SECONDS)).unwrap_or(ceiling)
}
