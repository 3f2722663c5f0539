//! Backing store trait definition

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use super::record::Record;

/// Backing store failures
///
/// `Unavailable` means the store could not be reached at all; `Query` means
/// it was reached and rejected or failed the statement.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Query error: {message}")]
    Query { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Result of an insert-or-update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Relational store reachable through single-key equality reads and upserts
///
/// Implementations must bind key and data values as query parameters.
/// Table and column names are validated by the caller before they get here.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackingStore: Send + Sync + Debug {
    /// Returns every row where `column = value`, in store order
    async fn query_equality(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError>;

    /// Updates rows where `key_column = key_value`, or inserts `data` when none exist
    async fn upsert(
        &self,
        table: &str,
        data: &Record,
        key_column: &str,
        key_value: &Value,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Releases pooled connections
    async fn close(&self);

    /// Short backend name used in log fields
    fn backend_name(&self) -> &'static str;
}
