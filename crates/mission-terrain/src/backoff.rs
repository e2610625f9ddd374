//! Retry budget for elevation lookups.
//!
//! Rate limiting (HTTP 429) and ordinary failures are counted separately:
//! 429 waits grow exponentially from the base delay, everything else waits
//! a flat delay. Each kind gives up once its own budget is spent.

use crate::config::ElevationConfig;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryBudget {
    base: Duration,
    max: Duration,
    jitter_ratio: f64,
    max_rate_limit_retries: u32,
    failure_delay: Duration,
    max_failure_attempts: u32,
    rate_limited: u32,
    failures: u32,
}

impl RetryBudget {
    pub fn new(config: &ElevationConfig) -> Self {
        let base = config.rate_limit_base_delay.max(Duration::from_millis(1));
        Self {
            base,
            max: config.max_backoff.max(base),
            jitter_ratio: config.jitter_ratio,
            max_rate_limit_retries: config.max_rate_limit_retries,
            failure_delay: config.failure_delay,
            max_failure_attempts: config.max_failure_attempts.max(1),
            rate_limited: 0,
            failures: 0,
        }
    }

    /// Record a 429; waits `base * 2^attempt` (plus jitter) for attempt 0, 1, ...
    pub fn rate_limited(&mut self) -> RetryDecision {
        if self.rate_limited >= self.max_rate_limit_retries {
            return RetryDecision::GiveUp;
        }
        let factor = 1u32.checked_shl(self.rate_limited).unwrap_or(u32::MAX);
        self.rate_limited += 1;
        let delay = self.base.saturating_mul(factor).min(self.max);
        RetryDecision::Retry(add_jitter(delay, self.jitter_ratio))
    }

    /// Record any other failed attempt.
    pub fn failed(&mut self) -> RetryDecision {
        self.failures += 1;
        if self.failures >= self.max_failure_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.failure_delay)
    }

    pub fn attempts(&self) -> u32 {
        self.rate_limited + self.failures
    }
}

fn add_jitter(delay: Duration, ratio: f64) -> Duration {
    if !(0.0..=1.0).contains(&ratio) {
        return delay;
    }

    let delay_ms = delay.as_millis();
    if delay_ms == 0 {
        return delay;
    }

    let jitter_ms_max = ((delay_ms as f64) * ratio) as u128;
    if jitter_ms_max == 0 {
        return delay;
    }

    let now_nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    let jitter_ms = (now_nanos as u128) % (jitter_ms_max + 1);
    delay + Duration::from_millis(jitter_ms as u64)
}
