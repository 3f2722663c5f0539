//! Upsert command - insert-or-update through the store write path

use anyhow::bail;
use clap::Args;
use serde_json::Value;

use super::init_app;
use crate::create_app_state;
use crate::domain::lookup::parse_key_value;
use crate::domain::store::{Record, UpsertOutcome};
use crate::infrastructure::observability::shutdown_tracing;

/// Arguments for the upsert command
#[derive(Args, Clone, Debug)]
pub struct UpsertArgs {
    /// Table to write to
    #[arg(long)]
    pub table: String,

    /// Column identifying the row
    #[arg(long)]
    pub key_column: String,

    /// Value of the key column
    #[arg(long, allow_hyphen_values = true)]
    pub key_value: String,

    /// Row data as a JSON object
    #[arg(long)]
    pub data: String,
}

/// Parses `--data` into a record
pub fn parse_record(data: &str) -> anyhow::Result<Record> {
    match serde_json::from_str::<Value>(data)? {
        Value::Object(record) if !record.is_empty() => Ok(record),
        Value::Object(_) => bail!("--data must name at least one column"),
        _ => bail!("--data must be a JSON object"),
    }
}

/// Run a single upsert
///
/// Cached entries for the key are not invalidated and expire by TTL.
pub async fn run(args: UpsertArgs) -> anyhow::Result<()> {
    let data = parse_record(&args.data)?;

    let config = init_app()?;
    let state = create_app_state(&config).await?;

    let outcome = state
        .gateway
        .upsert(
            args.table.trim(),
            &data,
            args.key_column.trim(),
            &parse_key_value(&args.key_value),
        )
        .await;
    state.shutdown().await;

    match outcome? {
        UpsertOutcome::Inserted => println!("Inserted new record into {}", args.table),
        UpsertOutcome::Updated => println!("Updated existing record in {}", args.table),
    }

    shutdown_tracing();
    Ok(())
}
