//! Serve-metrics command - Prometheus endpoint only

use anyhow::anyhow;

use super::{init_app, shutdown_signal};
use crate::infrastructure::observability::{init_metrics, serve_metrics, shutdown_tracing};

/// Run the metrics endpoint until Ctrl+C or SIGTERM
pub async fn run() -> anyhow::Result<()> {
    let config = init_app()?;

    let metrics = init_metrics(&config.observability.metrics)
        .ok_or_else(|| anyhow!("Metrics are disabled in configuration"))?;

    serve_metrics(metrics, &config.observability.metrics, shutdown_signal()).await?;

    shutdown_tracing();
    Ok(())
}
