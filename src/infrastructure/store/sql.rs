//! SQL text construction and parameter binding shared by the sqlx stores

use serde_json::Value;
use sqlx::query::Query;
use sqlx::{Database, Encode, Type};

use crate::domain::lookup::{validate_identifier, IdentifierKind};
use crate::domain::store::StoreError;

/// Identifier quoting and placeholder style of a SQL backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    Postgres,
}

impl SqlDialect {
    /// Quotes each dot-separated segment of an identifier
    pub fn quote_identifier(&self, identifier: &str) -> String {
        let quote = match self {
            Self::MySql => '`',
            Self::Postgres => '"',
        };

        identifier
            .split('.')
            .map(|segment| {
                let escaped = segment.replace(quote, &format!("{quote}{quote}"));
                format!("{quote}{escaped}{quote}")
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Bind placeholder for the 1-based parameter `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::MySql => "?".to_string(),
            Self::Postgres => format!("${}", index),
        }
    }

    /// `SELECT` of every row where `column` equals the first parameter
    ///
    /// Postgres rows come back as a single `record` JSON column so that every
    /// column type is rendered by the server.
    pub fn select_equality(&self, table: &str, column: &str) -> String {
        let inner = format!(
            "SELECT * FROM {} WHERE {} = {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            self.placeholder(1)
        );

        match self {
            Self::MySql => inner,
            Self::Postgres => format!("SELECT row_to_json(t) AS record FROM ({}) AS t", inner),
        }
    }

    pub fn count_equality(&self, table: &str, column: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE {} = {}",
            self.quote_identifier(table),
            self.quote_identifier(column),
            self.placeholder(1)
        )
    }

    /// `UPDATE` binding one parameter per column followed by the key value
    pub fn update(&self, table: &str, columns: &[&str], key_column: &str) -> String {
        let assignments = columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                format!("{} = {}", self.quote_identifier(column), self.placeholder(i + 1))
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.quote_identifier(table),
            assignments,
            self.quote_identifier(key_column),
            self.placeholder(columns.len() + 1)
        )
    }

    pub fn insert(&self, table: &str, columns: &[&str]) -> String {
        let names = columns
            .iter()
            .map(|column| self.quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| self.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote_identifier(table),
            names,
            placeholders
        )
    }
}

/// Re-checks identifiers at the store boundary before they reach SQL text
pub fn check_identifiers<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<(), StoreError> {
    validate_identifier(IdentifierKind::Table, table)
        .map_err(|e| StoreError::invalid_input(e.to_string()))?;

    for column in columns {
        validate_identifier(IdentifierKind::Column, column)
            .map_err(|e| StoreError::invalid_input(e.to_string()))?;
    }

    Ok(())
}

/// Binds a JSON value with the closest native SQL type
pub fn bind_json<'q, DB>(
    query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    value: &Value,
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
    sqlx::types::Json<Value>: Encode<'q, DB> + Type<DB>,
{
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if n.is_f64() {
                query.bind(n.as_f64().unwrap_or_default())
            } else {
                // u64 above i64::MAX
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(sqlx::types::Json(value.clone())),
    }
}

/// Maps a sqlx error onto the store error taxonomy
pub fn classify_sqlx_error(error: sqlx::Error) -> StoreError {
    let unavailable = matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_)
    );

    if unavailable {
        StoreError::unavailable(error.to_string())
    } else {
        StoreError::query(error.to_string())
    }
}
