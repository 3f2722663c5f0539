//! Fallback fetcher over a backing store

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::domain::fallback::{FallbackFetcher, FetchOutcome};
use crate::domain::lookup::{validate_identifier, IdentifierKind};
use crate::domain::store::{BackingStore, Record, StoreError, UpsertOutcome};

/// Fetcher that reads through a [`BackingStore`]
///
/// Built without a store when the connection failed at startup; every fetch
/// then reports `Unavailable`.
#[derive(Clone)]
pub struct StoreFallbackFetcher {
    store: Option<Arc<dyn BackingStore>>,
}

impl fmt::Debug for StoreFallbackFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreFallbackFetcher")
            .field("store", &self.store.as_ref().map(|s| s.backend_name()))
            .finish()
    }
}

impl StoreFallbackFetcher {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Fetcher with no connection
    pub fn unavailable() -> Self {
        Self { store: None }
    }

    pub fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    pub async fn close(&self) {
        if let Some(store) = &self.store {
            store.close().await;
        }
    }
}

#[async_trait]
impl FallbackFetcher for StoreFallbackFetcher {
    async fn fetch(&self, table_name: &str, key_column: &str, key_value: &Value) -> FetchOutcome {
        let Some(store) = &self.store else {
            warn!(table = table_name, "No database connection available");
            return FetchOutcome::Unavailable;
        };

        match store.query_equality(table_name, key_column, key_value).await {
            Ok(records) => {
                debug!(
                    table = table_name,
                    count = records.len(),
                    "Fetched records from the database"
                );
                FetchOutcome::Records(records)
            }
            Err(StoreError::Unavailable { message }) => {
                error!(table = table_name, error = %message, "Database unavailable");
                FetchOutcome::Unavailable
            }
            Err(e) => {
                error!(table = table_name, error = %e, "Database query failed");
                FetchOutcome::Records(Vec::new())
            }
        }
    }

    async fn upsert(
        &self,
        table_name: &str,
        data: &Record,
        key_column: &str,
        key_value: &Value,
    ) -> Result<UpsertOutcome, StoreError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| StoreError::unavailable("No database connection available"))?;

        if data.is_empty() {
            return Err(StoreError::invalid_input("Upsert data has no columns"));
        }

        validate_identifier(IdentifierKind::Table, table_name)
            .and_then(|_| validate_identifier(IdentifierKind::Column, key_column))
            .map_err(|e| StoreError::invalid_input(e.to_string()))?;
        for column in data.keys() {
            validate_identifier(IdentifierKind::Column, column)
                .map_err(|e| StoreError::invalid_input(e.to_string()))?;
        }

        let outcome = store.upsert(table_name, data, key_column, key_value).await?;
        debug!(table = table_name, ?outcome, "Upserted record");

        Ok(outcome)
    }
}
