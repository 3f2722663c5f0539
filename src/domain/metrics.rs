//! Observability seam for the cache-aside protocol

use std::fmt::Debug;
use std::time::Duration;

/// Counters and timings emitted by the gateway
///
/// Injected into the gateway so tests can count events without touching a
/// process-wide recorder. Implementations only record, never read back.
pub trait CacheMetrics: Send + Sync + Debug {
    fn record_hit(&self, table_name: &str);

    fn record_miss(&self, table_name: &str);

    fn record_fetch_duration(&self, table_name: &str, duration: Duration);
}

/// Metrics sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    fn record_hit(&self, _table_name: &str) {}

    fn record_miss(&self, _table_name: &str) {}

    fn record_fetch_duration(&self, _table_name: &str, _duration: Duration) {}
}
