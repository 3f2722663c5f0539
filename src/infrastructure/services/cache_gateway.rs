//! Cache-aside lookup service

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::FutureExt;
use serde::Serialize;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::domain::cache::{Cache, CacheExt, CacheKey};
use crate::domain::fallback::{FallbackFetcher, FetchOutcome};
use crate::domain::lookup::{LookupRequest, LookupResult, LookupValidationError};
use crate::domain::metrics::CacheMetrics;
use crate::domain::store::{Record, StoreError, UpsertOutcome};

use super::single_flight::SingleFlight;

/// Configuration for the cache gateway
#[derive(Debug, Clone)]
pub struct CacheGatewayConfig {
    /// TTL applied when populating after a miss
    pub default_ttl: Duration,
    /// Bound on every cache read and write
    pub cache_timeout: Duration,
    /// Bound on every fallback fetch
    pub store_timeout: Duration,
    /// Share one fallback fetch between concurrent misses on the same key
    pub coalesce_misses: bool,
}

impl Default for CacheGatewayConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(300),
            cache_timeout: Duration::from_secs(2),
            store_timeout: Duration::from_secs(10),
            coalesce_misses: false,
        }
    }
}

impl CacheGatewayConfig {
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_coalesced_misses(mut self) -> Self {
        self.coalesce_misses = true;
        self
    }
}

/// Cache-aside gateway in front of a fallback fetcher
///
/// Reads go to the cache first. On a miss the fetcher is consulted and a
/// non-empty result is written back with the configured TTL. Cache failures
/// degrade to a miss (read) or a skipped write (populate); only request
/// validation fails a lookup.
#[derive(Debug, Clone)]
pub struct CacheGateway {
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn FallbackFetcher>,
    metrics: Arc<dyn CacheMetrics>,
    config: CacheGatewayConfig,
    in_flight: Arc<SingleFlight<LookupResult>>,
}

impl CacheGateway {
    /// Creates a new gateway with default configuration
    pub fn new(
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn FallbackFetcher>,
        metrics: Arc<dyn CacheMetrics>,
    ) -> Self {
        Self::with_config(cache, fetcher, metrics, CacheGatewayConfig::default())
    }

    pub fn with_config(
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn FallbackFetcher>,
        metrics: Arc<dyn CacheMetrics>,
        config: CacheGatewayConfig,
    ) -> Self {
        Self {
            cache,
            fetcher,
            metrics,
            config,
            in_flight: Arc::new(SingleFlight::new()),
        }
    }

    pub fn config(&self) -> &CacheGatewayConfig {
        &self.config
    }

    pub fn default_ttl(&self) -> Duration {
        self.config.default_ttl
    }

    /// Looks up `table_name.key_column = key_value`, cache first
    pub async fn lookup(
        &self,
        request: &LookupRequest,
    ) -> Result<LookupResult, LookupValidationError> {
        let key = request.validate()?;
        let started = Instant::now();

        if let Some(value) = self.probe(&key).await {
            self.metrics.record_hit(&request.table_name);
            info!(
                key = %key,
                elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                "Cache HIT"
            );
            return Ok(LookupResult::Hit(value));
        }

        self.metrics.record_miss(&request.table_name);
        warn!(key = %key, "Cache MISS");

        let result = if self.config.coalesce_misses {
            let gateway = self.clone();
            let request = request.clone();
            let shared_key = key.clone();

            self.in_flight
                .run(key.as_str(), move || {
                    async move { gateway.fetch_and_populate(&request, &shared_key).await }.boxed()
                })
                .await
        } else {
            self.fetch_and_populate(request, &key).await
        };

        debug!(
            key = %key,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Lookup finished after miss"
        );

        Ok(result)
    }

    /// Writes `value` under `key` with expiry `ttl`
    ///
    /// Failures are logged and swallowed.
    pub async fn populate<V>(&self, key: &CacheKey, value: &V, ttl: Duration)
    where
        V: Serialize + Send + Sync + ?Sized,
    {
        match timeout(self.config.cache_timeout, self.cache.set(key.as_str(), value, ttl)).await {
            Ok(Ok(())) => {
                debug!(key = %key, ttl_secs = ttl.as_secs_f64(), "Cached value");
            }
            Ok(Err(e)) => {
                error!(key = %key, error = %e, "Cache write failed");
            }
            Err(_) => {
                error!(key = %key, timeout = ?self.config.cache_timeout, "Cache write timed out");
            }
        }
    }

    /// Insert-or-update through the fetcher's write path
    ///
    /// Cached entries for the key are left alone and age out by TTL.
    pub async fn upsert(
        &self,
        table_name: &str,
        data: &Record,
        key_column: &str,
        key_value: &Value,
    ) -> Result<UpsertOutcome, StoreError> {
        timeout(
            self.config.store_timeout,
            self.fetcher.upsert(table_name, data, key_column, key_value),
        )
        .await
        .map_err(|_| {
            StoreError::unavailable(format!(
                "Upsert timed out after {:?}",
                self.config.store_timeout
            ))
        })?
    }

    async fn probe(&self, key: &CacheKey) -> Option<Value> {
        match timeout(self.config.cache_timeout, self.cache.get::<Value>(key.as_str())).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                error!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
            Err(_) => {
                error!(key = %key, timeout = ?self.config.cache_timeout, "Cache read timed out, treating as miss");
                None
            }
        }
    }

    async fn fetch_and_populate(&self, request: &LookupRequest, key: &CacheKey) -> LookupResult {
        let started = Instant::now();
        let fetch = self.fetcher.fetch(
            &request.table_name,
            &request.key_column,
            &request.key_value,
        );

        let outcome = match timeout(self.config.store_timeout, fetch).await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(
                    table = %request.table_name,
                    timeout = ?self.config.store_timeout,
                    "Database fetch timed out"
                );
                FetchOutcome::Unavailable
            }
        };

        self.metrics
            .record_fetch_duration(&request.table_name, started.elapsed());

        match &outcome {
            FetchOutcome::Records(records) if !records.is_empty() => {
                self.populate(key, records, self.config.default_ttl).await;
                info!(
                    key = %key,
                    records = records.len(),
                    elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                    "Fetched from the database and cached"
                );
            }
            FetchOutcome::Records(_) => {
                debug!(key = %key, "No records found, not caching");
            }
            FetchOutcome::Unavailable => {
                error!(key = %key, "Database unavailable, returning no data");
            }
        }

        LookupResult::from_fetch(outcome)
    }
}
