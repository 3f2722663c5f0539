//! PostgreSQL backing store

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::{debug, info};

use crate::domain::store::{BackingStore, Record, StoreError, UpsertOutcome};

use super::factory::StoreConfig;
use super::sql::{bind_json, check_identifiers, classify_sqlx_error, SqlDialect};

const DIALECT: SqlDialect = SqlDialect::Postgres;

/// PostgreSQL store with connection pooling
///
/// Rows are rendered server-side with `row_to_json`. Key values are bound
/// with their JSON type, so a numeric key compared against a text column is
/// rejected by the server as a query error.
pub struct PostgresStore {
    pool: PgPool,
}

impl Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| {
                StoreError::unavailable(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        info!("Connected to PostgreSQL");

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl BackingStore for PostgresStore {
    async fn query_equality(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        check_identifiers(table, [column])?;

        let sql = DIALECT.select_equality(table, column);
        let rows = bind_json(sqlx::query(&sql), value)
            .fetch_all(&self.pool)
            .await
            .map_err(classify_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let record: Value = row.try_get("record").map_err(classify_sqlx_error)?;
                match record {
                    Value::Object(map) => Ok(map),
                    other => Err(StoreError::query(format!(
                        "Expected a JSON object row, got {}",
                        other
                    ))),
                }
            })
            .collect()
    }

    async fn upsert(
        &self,
        table: &str,
        data: &Record,
        key_column: &str,
        key_value: &Value,
    ) -> Result<UpsertOutcome, StoreError> {
        if data.is_empty() {
            return Err(StoreError::invalid_input("Upsert data has no columns"));
        }

        let columns: Vec<&str> = data.keys().map(String::as_str).collect();
        check_identifiers(table, columns.iter().copied().chain([key_column]))?;

        let mut tx = self.pool.begin().await.map_err(classify_sqlx_error)?;

        let count_sql = DIALECT.count_equality(table, key_column);
        let existing: i64 = bind_json(sqlx::query(&count_sql), key_value)
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get(0))
            .map_err(classify_sqlx_error)?;

        let outcome = if existing > 0 {
            let sql = DIALECT.update(table, &columns, key_column);
            let query = data
                .values()
                .fold(sqlx::query(&sql), |query, value| bind_json(query, value));
            bind_json(query, key_value)
                .execute(&mut *tx)
                .await
                .map_err(classify_sqlx_error)?;
            UpsertOutcome::Updated
        } else {
            let sql = DIALECT.insert(table, &columns);
            data.values()
                .fold(sqlx::query(&sql), |query, value| bind_json(query, value))
                .execute(&mut *tx)
                .await
                .map_err(classify_sqlx_error)?;
            UpsertOutcome::Inserted
        };

        tx.commit().await.map_err(classify_sqlx_error)?;

        debug!(table, key_column, ?outcome, "Upsert committed");
        Ok(outcome)
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
