//! Row representation shared by stores, fetchers and the cache

use serde_json::{Map, Value};

/// One row: column name to JSON value
pub type Record = Map<String, Value>;

/// Compares a stored column value with a lookup key the way SQL equality on
/// mixed types behaves in practice: same JSON value, or same textual form
/// (`52000` matches `"52000"`).
pub fn values_match(column_value: &Value, key_value: &Value) -> bool {
    if column_value == key_value {
        return true;
    }

    match (scalar_text(column_value), scalar_text(key_value)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
