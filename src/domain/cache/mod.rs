//! Cache domain - key-value cache abstraction with TTL

mod key;
mod repository;

pub use key::CacheKey;
pub use repository::{Cache, CacheExt};

#[cfg(test)]
pub use repository::mock::MockCache;
