//! Backing store infrastructure - relational store implementations

mod factory;
mod in_memory;
mod mysql;
mod postgres;
mod sql;

pub use factory::{StoreConfig, StoreFactory, StoreType};
pub use in_memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use postgres::PostgresStore;
pub use sql::{classify_sqlx_error, SqlDialect};
