//! Lookup result and the degrade-to-absence mapping

use serde_json::Value;

use crate::domain::fallback::FetchOutcome;
use crate::domain::store::Record;

/// Outcome of a cache-aside lookup
///
/// A hit carries whatever JSON was stored under the key; a miss that found
/// rows carries them as a list. The two shapes are kept apart on purpose so
/// callers can tell where a value came from.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    /// Served from the cache
    Hit(Value),
    /// Fetched from the backing store (never empty)
    Fetched(Vec<Record>),
    /// The backing store answered with no rows, or the query failed
    Empty,
    /// The backing store could not be reached
    Unavailable,
}

impl LookupResult {
    /// Maps a fallback outcome onto a lookup result
    pub fn from_fetch(outcome: FetchOutcome) -> Self {
        match outcome {
            FetchOutcome::Records(records) if records.is_empty() => Self::Empty,
            FetchOutcome::Records(records) => Self::Fetched(records),
            FetchOutcome::Unavailable => Self::Unavailable,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// True when there is nothing to hand back to the caller
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Empty | Self::Unavailable)
    }

    /// JSON view of the result: the cached value, the record list, `[]` for
    /// an empty fetch and `null` when the store was unavailable
    pub fn to_json(&self) -> Value {
        match self {
            Self::Hit(value) => value.clone(),
            Self::Fetched(records) => {
                Value::Array(records.iter().cloned().map(Value::Object).collect())
            }
            Self::Empty => Value::Array(Vec::new()),
            Self::Unavailable => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_fetch_non_empty() {
        let records = vec![record(json!({"salary": 52000, "emp_no": 12345}))];
        let result = LookupResult::from_fetch(FetchOutcome::Records(records.clone()));
        assert_eq!(result, LookupResult::Fetched(records));
    }

    #[test]
    fn test_from_fetch_empty() {
        let result = LookupResult::from_fetch(FetchOutcome::Records(vec![]));
        assert_eq!(result, LookupResult::Empty);
        assert!(result.is_absent());
    }

    #[test]
    fn test_from_fetch_unavailable() {
        let result = LookupResult::from_fetch(FetchOutcome::Unavailable);
        assert_eq!(result, LookupResult::Unavailable);
        assert!(result.is_absent());
    }

    #[test]
    fn test_to_json() {
        let records = vec![record(json!({"salary": 52000, "emp_no": 12345}))];

        assert_eq!(
            LookupResult::Fetched(records).to_json(),
            json!([{"salary": 52000, "emp_no": 12345}])
        );
        assert_eq!(LookupResult::Hit(json!("cached_result")).to_json(), json!("cached_result"));
        assert_eq!(LookupResult::Empty.to_json(), json!([]));
        assert_eq!(LookupResult::Unavailable.to_json(), Value::Null);
    }
}
