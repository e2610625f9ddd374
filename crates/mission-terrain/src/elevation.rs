//! Terrain elevation lookups against an Open-Elevation style service.
//!
//! `get_elevation` never fails: once its retry budget is spent it logs a
//! warning and returns `0.0`, which the mission builder reads as "unknown".

use crate::backoff::{RetryBudget, RetryDecision};
use crate::cache::ElevationCache;
use crate::config::ElevationConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a single request to the elevation service.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Elevation(f64),
    RateLimited,
    Failed(String),
}

#[async_trait]
pub trait ElevationTransport: Send + Sync {
    async fn fetch(&self, lat: f64, lon: f64) -> FetchOutcome;
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    elevation: Option<f64>,
}

/// `GET <endpoint>?locations=lat,lon`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ElevationTransport for HttpTransport {
    async fn fetch(&self, lat: f64, lon: f64) -> FetchOutcome {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("locations", format!("{lat},{lon}"))])
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => return FetchOutcome::Failed(err.to_string()),
        };

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return FetchOutcome::RateLimited,
            status => return FetchOutcome::Failed(format!("elevation service HTTP {status}")),
        }

        match response.json::<LookupResponse>().await {
            Ok(payload) => match payload.results.first().and_then(|r| r.elevation) {
                Some(elevation) if elevation.is_finite() => FetchOutcome::Elevation(elevation),
                _ => FetchOutcome::Failed("elevation service returned no elevation".to_string()),
            },
            Err(err) => FetchOutcome::Failed(err.to_string()),
        }
    }
}

pub struct ElevationClient {
    transport: Option<Arc<dyn ElevationTransport>>,
    cache: ElevationCache,
    config: ElevationConfig,
    requests: AtomicUsize,
}

impl std::fmt::Debug for ElevationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevationClient")
            .field("enabled", &self.transport.is_some())
            .field("endpoint", &self.config.endpoint)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl ElevationClient {
    pub fn new(config: ElevationConfig) -> Self {
        let transport = HttpTransport::new(config.endpoint.clone(), config.timeout);
        Self::with_transport(Arc::new(transport), config)
    }

    pub fn with_transport(transport: Arc<dyn ElevationTransport>, config: ElevationConfig) -> Self {
        Self {
            transport: Some(transport),
            cache: ElevationCache::new(config.cache_capacity),
            config,
            requests: AtomicUsize::new(0),
        }
    }

    /// Offline client: every lookup answers `0.0` without I/O.
    pub fn disabled() -> Self {
        let config = ElevationConfig::default();
        Self {
            transport: None,
            cache: ElevationCache::new(config.cache_capacity),
            config,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn config(&self) -> &ElevationConfig {
        &self.config
    }

    /// Terrain elevation in meters AMSL, or `0.0` when unknown.
    pub async fn get_elevation(&self, lat: f64, lon: f64) -> f64 {
        if let Some(elevation) = self.cache.get(lat, lon) {
            tracing::trace!(lat, lon, elevation, "Elevation cache hit");
            return elevation;
        }
        let Some(transport) = &self.transport else {
            return 0.0;
        };

        let mut budget = RetryBudget::new(&self.config);
        loop {
            self.requests.fetch_add(1, Ordering::Relaxed);
            let decision = match transport.fetch(lat, lon).await {
                FetchOutcome::Elevation(elevation) => {
                    self.cache.insert(lat, lon, elevation);
                    return elevation;
                }
                FetchOutcome::RateLimited => {
                    tracing::debug!(lat, lon, "Elevation service rate limited");
                    budget.rate_limited()
                }
                FetchOutcome::Failed(reason) => {
                    tracing::debug!(lat, lon, %reason, "Elevation lookup failed");
                    budget.failed()
                }
            };
            match decision {
                RetryDecision::Retry(delay) => tokio::time::sleep(delay).await,
                RetryDecision::GiveUp => {
                    tracing::warn!(
                        lat,
                        lon,
                        attempts = budget.attempts(),
                        "Elevation lookup gave up, using 0"
                    );
                    return 0.0;
                }
            }
        }
    }

    /// Remote requests issued so far, retries included.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}
