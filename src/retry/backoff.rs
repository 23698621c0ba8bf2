//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Calculate the delay to wait after failed attempt `attempt` (1-indexed).
///
/// `base * 2^(attempt - 1)` capped at `max`, then scaled by a factor drawn
/// uniformly from `[1 - jitter, 1 + jitter]` using `rng`. A zero base becomes
/// one millisecond and `max` is raised to at least `base`.
pub fn backoff_delay<R>(base: Duration, max: Duration, attempt: u32, jitter: f64, rng: &mut R) -> Duration
where
    R: Rng + ?Sized,
{
    let attempt = attempt.max(1);
    let base = if base.is_zero() {
        Duration::from_millis(1)
    } else {
        base
    };
    let max = max.max(base);

    let delay = 2u32
        .checked_pow(attempt - 1)
        .and_then(|multiplier| base.checked_mul(multiplier))
        .map_or(max, |delay| delay.min(max));

    // Also rejects NaN
    if !(jitter > 0.0) {
        return delay;
    }
    let jitter = jitter.min(1.0);

    let factor = rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
    let secs = delay.as_secs_f64() * factor;
    // Products past Duration::MAX saturate instead of collapsing to zero
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}
