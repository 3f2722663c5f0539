//! Backing store domain - relational store abstraction

mod record;
mod repository;

pub use record::{values_match, Record};
pub use repository::{BackingStore, StoreError, UpsertOutcome};

#[cfg(test)]
pub use repository::MockBackingStore;
