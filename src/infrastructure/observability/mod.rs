//! Observability infrastructure - Tracing and Metrics

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, serve_metrics, PrometheusCacheMetrics,
    PrometheusMetrics, CACHE_HITS, CACHE_MISSES, DB_QUERY_TIME,
};
pub use tracing_setup::{init_tracing, shutdown_tracing};
