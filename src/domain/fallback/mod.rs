//! Fallback domain - the read used when the cache misses

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::store::{Record, StoreError, UpsertOutcome};

/// What a fallback fetch produced
///
/// `Records(vec![])` means the store answered with nothing; `Unavailable`
/// means it could not answer.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Records(Vec<Record>),
    Unavailable,
}

impl FetchOutcome {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

/// Backing-store access used by the gateway on a cache miss
#[async_trait]
pub trait FallbackFetcher: Send + Sync + Debug {
    /// Fetches every record where `key_column = key_value`
    ///
    /// Never fails: connectivity problems become `Unavailable` and query
    /// failures become an empty record list.
    async fn fetch(&self, table_name: &str, key_column: &str, key_value: &Value) -> FetchOutcome;

    /// Write path for callers outside the read protocol
    async fn upsert(
        &self,
        _table_name: &str,
        _data: &Record,
        _key_column: &str,
        _key_value: &Value,
    ) -> Result<UpsertOutcome, StoreError> {
        Err(StoreError::unavailable("fetcher has no write path"))
    }
}
