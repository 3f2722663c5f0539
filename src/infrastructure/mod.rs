//! Infrastructure layer - Cache, store and observability implementations

pub mod cache;
pub mod fallback;
pub mod logging;
pub mod observability;
pub mod services;
pub mod store;
