//! MySQL backing store

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::domain::store::{BackingStore, Record, StoreError, UpsertOutcome};

use super::factory::StoreConfig;
use super::sql::{bind_json, check_identifiers, classify_sqlx_error, SqlDialect};

const DIALECT: SqlDialect = SqlDialect::MySql;

/// MySQL store with connection pooling
pub struct MySqlStore {
    pool: MySqlPool,
}

impl Debug for MySqlStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Opens the pool and verifies that a connection can be established
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| StoreError::unavailable(format!("Failed to connect to MySQL: {}", e)))?;

        info!("Connected to MySQL");

        Ok(Self::new(pool))
    }
}

/// Converts a row to a record, rendering non-JSON column types as text
fn row_to_record(row: &MySqlRow) -> Record {
    let mut record = Record::new();

    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name());
        record.insert(column.name().to_string(), value);
    }

    record
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(e) => {
            debug!(column = idx, error = %e, "Unreadable column");
            return Value::Null;
        }
    }

    let decoded = match type_name {
        "BOOLEAN" => row.try_get::<bool, _>(idx).map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(idx).map(Value::from)
        }
        name if name.ends_with("UNSIGNED") => row.try_get::<u64, _>(idx).map(Value::from),
        "FLOAT" => row.try_get::<f32, _>(idx).map(|v| Value::from(f64::from(v))),
        "DOUBLE" => row.try_get::<f64, _>(idx).map(Value::from),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(|v| Value::String(v.to_string())),
        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| Value::String(v.naive_utc().to_string())),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(|v| Value::String(v.to_string())),
        "JSON" => row.try_get::<Value, _>(idx),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(|v| Value::String(String::from_utf8_lossy(&v).into_owned())),
        // DECIMAL and the text family
        _ => row.try_get_unchecked::<String, _>(idx).map(Value::String),
    };

    decoded
        .or_else(|_| row.try_get_unchecked::<String, _>(idx).map(Value::String))
        .unwrap_or_else(|e| {
            debug!(column = idx, type_name, error = %e, "Undecodable column");
            Value::Null
        })
}

#[async_trait]
impl BackingStore for MySqlStore {
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

        Ok(rows.iter().map(row_to_record).collect())
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
        "mysql"
    }
}
