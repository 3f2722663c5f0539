//! Prometheus metrics infrastructure

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, describe_counter, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::domain::metrics::CacheMetrics;

use super::config::MetricsConfig;

pub const CACHE_HITS: &str = "cache_hits_total";
pub const CACHE_MISSES: &str = "cache_misses_total";
pub const DB_QUERY_TIME: &str = "db_query_time_seconds";

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Installs the global Prometheus recorder
///
/// Returns `None` when metrics are disabled or a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            register_default_metrics();

            tracing::info!(addr = %config.addr, path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

fn register_default_metrics() {
    describe_counter!(CACHE_HITS, "Number of cache hits");
    describe_counter!(CACHE_MISSES, "Number of cache misses");
    describe_histogram!(DB_QUERY_TIME, Unit::Seconds, "Time spent querying the database");

    gauge!("shadow_cache_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// [`CacheMetrics`] sink writing to the global `metrics` recorder
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusCacheMetrics;

impl CacheMetrics for PrometheusCacheMetrics {
    fn record_hit(&self, table_name: &str) {
        counter!(CACHE_HITS, "table" => table_name.to_string()).increment(1);
    }

    fn record_miss(&self, table_name: &str) {
        counter!(CACHE_MISSES, "table" => table_name.to_string()).increment(1);
    }

    fn record_fetch_duration(&self, table_name: &str, duration: Duration) {
        histogram!(DB_QUERY_TIME, "table" => table_name.to_string())
            .record(duration.as_secs_f64());
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Serves the scrape endpoint until `shutdown` resolves
pub async fn serve_metrics<F>(
    metrics: PrometheusMetrics,
    config: &MetricsConfig,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = config.addr.parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, path = %config.path, "Metrics endpoint listening");

    axum::serve(listener, create_metrics_router(metrics, &config.path))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn local_metrics() -> (PrometheusMetrics, PrometheusRecorder) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let metrics = PrometheusMetrics {
            handle: Arc::new(recorder.handle()),
        };
        (metrics, recorder)
    }

    #[test]
    fn test_cache_metrics_are_rendered() {
        let (prometheus, recorder) = local_metrics();

        metrics::with_local_recorder(&recorder, || {
            let sink = PrometheusCacheMetrics;
            sink.record_hit("salaries");
            sink.record_hit("salaries");
            sink.record_miss("salaries");
            sink.record_fetch_duration("salaries", Duration::from_millis(12));
        });

        let rendered = prometheus.render();
        assert!(rendered.contains("cache_hits_total{table=\"salaries\"} 2"));
        assert!(rendered.contains("cache_misses_total{table=\"salaries\"} 1"));
        assert!(rendered.contains("db_query_time_seconds"));
    }

    #[test]
    fn test_disabled_metrics_install_nothing() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };

        assert!(init_metrics(&config).is_none());
    }

    #[tokio::test]
    async fn test_metrics_endpoint_serves_scrape_text() {
        let (prometheus, recorder) = local_metrics();
        metrics::with_local_recorder(&recorder, || PrometheusCacheMetrics.record_miss("departments"));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = create_metrics_router(prometheus, "/metrics");
        let server = tokio::spawn(async move { axum::serve(listener, router).await });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("cache_misses_total{table=\"departments\"} 1"));

        server.abort();
    }
}
