//! Cache factory for runtime selection

use std::fmt;
use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};
use tracing::{error, info, warn};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};

/// Supported cache types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CacheType {
    /// In-memory cache using moka
    InMemory,
    /// Redis cache
    #[default]
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for cache factory
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Type of cache to create
    pub cache_type: CacheType,
    /// Redis URL (required for Redis type)
    pub redis_url: Option<String>,
    /// Key prefix for namespacing (Redis only)
    pub key_prefix: Option<String>,
    /// Maximum capacity (for in-memory cache)
    pub max_capacity: Option<u64>,
    /// Connection timeout (Redis only)
    pub connection_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheType::Redis,
            redis_url: Some("redis://localhost:6379".to_string()),
            key_prefix: None,
            max_capacity: Some(10_000),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration for in-memory cache
    pub fn in_memory() -> Self {
        Self {
            cache_type: CacheType::InMemory,
            redis_url: None,
            ..Default::default()
        }
    }

    /// Creates a new configuration for Redis cache
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the maximum capacity (in-memory only)
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the connection timeout (Redis only)
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Default pause between reconnection attempts
const RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

/// Cache stand-in used when the real cache could not be reached at startup
///
/// Operations fail, which the gateway turns into a miss on read and a
/// skipped write on populate, until a reconnection attempt succeeds. At most
/// one attempt runs per `retry_interval`; after that every call goes to the
/// connected cache.
pub struct DisconnectedCache {
    config: CacheConfig,
    retry_interval: Duration,
    connected: OnceCell<Arc<dyn Cache>>,
    last_attempt: Mutex<Option<Instant>>,
    reason: std::sync::Mutex<String>,
}

impl fmt::Debug for DisconnectedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisconnectedCache")
            .field("cache_type", &self.config.cache_type)
            .field("retry_interval", &self.retry_interval)
            .field("connected", &self.connected.initialized())
            .finish()
    }
}

impl DisconnectedCache {
    pub fn new(reason: impl Into<String>, config: CacheConfig) -> Self {
        Self {
            config,
            retry_interval: RECONNECT_INTERVAL,
            connected: OnceCell::new(),
            last_attempt: Mutex::new(Some(Instant::now())),
            reason: std::sync::Mutex::new(reason.into()),
        }
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    fn error(&self) -> DomainError {
        let reason = self
            .reason
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        DomainError::cache(format!("Cache not connected: {}", reason))
    }

    async fn cache(&self) -> Result<Arc<dyn Cache>, DomainError> {
        if let Some(cache) = self.connected.get() {
            return Ok(cache.clone());
        }

        // Callers arriving while an attempt is running fail fast
        let Ok(mut last_attempt) = self.last_attempt.try_lock() else {
            return Err(self.error());
        };

        if let Some(cache) = self.connected.get() {
            return Ok(cache.clone());
        }

        if (*last_attempt).is_some_and(|at| at.elapsed() < self.retry_interval) {
            return Err(self.error());
        }

        *last_attempt = Some(Instant::now());

        match CacheFactory::new().create(&self.config).await {
            Ok(cache) => {
                info!(backend = cache.backend_name(), "Cache connection re-established");
                let _ = self.connected.set(cache.clone());
                Ok(cache)
            }
            Err(e) => {
                warn!(cache_type = %self.config.cache_type, error = %e, "Cache reconnection failed");
                *self.reason.lock().unwrap_or_else(PoisonError::into_inner) = e.to_string();
                Err(self.error())
            }
        }
    }
}

#[async_trait]
impl Cache for DisconnectedCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        self.cache().await?.get_raw(key).await
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        self.cache().await?.set_raw(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        self.cache().await?.delete(key).await
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        self.cache().await?.ttl(key).await
    }

    fn backend_name(&self) -> &'static str {
        self.connected
            .get()
            .map_or("disconnected", |cache| cache.backend_name())
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a new cache factory
    pub fn new() -> Self {
        Self
    }

    /// Creates a cache instance based on configuration
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        match config.cache_type {
            CacheType::InMemory => {
                let mut in_memory_config = InMemoryCacheConfig::default();

                if let Some(capacity) = config.max_capacity {
                    in_memory_config = in_memory_config.with_max_capacity(capacity);
                }

                Ok(Arc::new(InMemoryCache::with_config(in_memory_config)))
            }
            CacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis cache type")
                })?;

                let mut redis_config = RedisCacheConfig::new(url)
                    .with_connection_timeout(config.connection_timeout);

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                let cache = RedisCache::new(redis_config).await?;
                Ok(Arc::new(cache))
            }
        }
    }

    /// Creates the configured cache, or a [`DisconnectedCache`] that keeps
    /// retrying when the cache cannot be reached, so lookups keep working
    /// against the store
    pub async fn create_or_disconnected(&self, config: &CacheConfig) -> Arc<dyn Cache> {
        match self.create(config).await {
            Ok(cache) => {
                info!(backend = cache.backend_name(), "Cache connection established");
                cache
            }
            Err(e) => {
                error!(cache_type = %config.cache_type, error = %e, "Cache connection error");
                Arc::new(DisconnectedCache::new(e.to_string(), config.clone()))
            }
        }
    }
}
