//! Elevation service configuration from environment.

use std::env;
use std::time::Duration;

pub const DEFAULT_ELEVATION_URL: &str = "https://api.open-elevation.com/api/v1/lookup";

#[derive(Debug, Clone, PartialEq)]
pub struct ElevationConfig {
    pub endpoint: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// First delay after HTTP 429; doubled on every further 429.
    pub rate_limit_base_delay: Duration,
    pub max_rate_limit_retries: u32,
    /// Ceiling for the doubled rate-limit delay.
    pub max_backoff: Duration,
    /// Fraction of random extra delay added to rate-limit waits.
    pub jitter_ratio: f64,
    /// Delay between attempts after any other failure.
    pub failure_delay: Duration,
    pub max_failure_attempts: u32,
    pub cache_capacity: usize,
    /// Lookups in flight at once during plan generation.
    pub concurrency: usize,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ELEVATION_URL.to_string(),
            timeout: Duration::from_secs(5),
            rate_limit_base_delay: Duration::from_secs(1),
            max_rate_limit_retries: 5,
            max_backoff: Duration::from_secs(60),
            jitter_ratio: 0.2,
            failure_delay: Duration::from_millis(500),
            max_failure_attempts: 3,
            cache_capacity: 4096,
            concurrency: 4,
        }
    }
}

impl ElevationConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("ELEVATION_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.endpoint),
            timeout: env::var("ELEVATION_TIMEOUT_S")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            max_rate_limit_retries: env::var("ELEVATION_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_rate_limit_retries),
            cache_capacity: env::var("ELEVATION_CACHE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cache_capacity),
            concurrency: env::var("ELEVATION_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .map(|n| n.max(1))
                .unwrap_or(defaults.concurrency),
            ..defaults
        }
    }
}
