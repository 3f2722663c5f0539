//! Cache key construction

use std::fmt;

/// Key under which a lookup result is cached: `"{table_name}:{key_value}"`
///
/// Two lookups against the same table and key value always share a key,
/// whatever column they filter on. Callers keep namespaces apart by using
/// distinct table names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for a table and the textual form of a key value
    pub fn build(table_name: &str, key_value: &str) -> Self {
        Self(format!("{}:{}", table_name, key_value))
    }

    /// Returns the string representation of the key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
