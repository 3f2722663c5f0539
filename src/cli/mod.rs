//! CLI module for Shadow Cache
//!
//! Provides subcommands for driving the cache-aside gateway:
//! - `repl`: interactive lookups with the metrics endpoint running
//! - `lookup`: one-shot lookup printed as JSON
//! - `upsert`: insert-or-update a row in the backing store
//! - `serve-metrics`: metrics endpoint only

pub mod lookup;
pub mod repl;
pub mod serve_metrics;
pub mod upsert;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::observability::init_tracing;

/// Shadow Cache - read-through cache in front of a relational store
#[derive(Parser)]
#[command(name = "shadow-cache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Interactive lookup loop (default mode)
    Repl,

    /// Look up one key and print the result
    Lookup(lookup::LookupArgs),

    /// Insert or update a row in the backing store
    Upsert(upsert::UpsertArgs),

    /// Serve the Prometheus endpoint only
    ServeMetrics,
}

/// Loads `.env` and the layered configuration, then installs logging
pub(crate) fn init_app() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging, &config.observability.tracing);

    Ok(config)
}

pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
