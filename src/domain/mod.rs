//! Domain layer - Cache-aside protocol types and collaborator traits

pub mod cache;
pub mod error;
pub mod fallback;
pub mod lookup;
pub mod metrics;
pub mod store;

pub use cache::{Cache, CacheExt, CacheKey};
pub use error::DomainError;
pub use fallback::{FallbackFetcher, FetchOutcome};
pub use lookup::{LookupRequest, LookupResult, LookupValidationError};
pub use metrics::{CacheMetrics, NoopMetrics};
pub use store::{BackingStore, Record, StoreError, UpsertOutcome};
