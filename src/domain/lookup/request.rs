//! Lookup request

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::{
    key_value_text, validate_identifier, IdentifierKind, LookupValidationError,
};
use crate::domain::cache::CacheKey;

/// Single-key equality lookup: `SELECT * FROM table_name WHERE key_column = key_value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub table_name: String,
    pub key_column: String,
    pub key_value: Value,
}

impl LookupRequest {
    pub fn new(
        table_name: impl Into<String>,
        key_column: impl Into<String>,
        key_value: impl Into<Value>,
    ) -> Self {
        Self {
            table_name: table_name.into(),
            key_column: key_column.into(),
            key_value: key_value.into(),
        }
    }

    /// Validates every field and returns the cache key for the request
    pub fn validate(&self) -> Result<CacheKey, LookupValidationError> {
        if self.table_name.trim().is_empty() {
            return Err(LookupValidationError::MissingTableName);
        }

        if self.key_column.trim().is_empty() {
            return Err(LookupValidationError::MissingKeyColumn);
        }

        let key_text = key_value_text(&self.key_value)?;

        validate_identifier(IdentifierKind::Table, &self.table_name)?;
        validate_identifier(IdentifierKind::Column, &self.key_column)?;

        Ok(CacheKey::build(&self.table_name, &key_text))
    }
}

/// Parses raw user input into a key value
///
/// Input that is valid JSON scalar text (`52000`, `12.5`, `true`) keeps its
/// type; anything else is taken as a string.
pub fn parse_key_value(input: &str) -> Value {
    let trimmed = input.trim();

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::String(_))) => value,
        _ => Value::String(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_request_builds_key() {
        let request = LookupRequest::new("salaries", "salary", 52000);
        let key = request.validate().unwrap();
        assert_eq!(key.as_str(), "salaries:52000");
    }

    #[test]
    fn test_missing_fields() {
        assert_eq!(
            LookupRequest::new("", "salary", 1).validate(),
            Err(LookupValidationError::MissingTableName)
        );
        assert_eq!(
            LookupRequest::new("salaries", "  ", 1).validate(),
            Err(LookupValidationError::MissingKeyColumn)
        );
        assert_eq!(
            LookupRequest::new("salaries", "salary", Value::Null).validate(),
            Err(LookupValidationError::MissingKeyValue)
        );
        assert_eq!(
            LookupRequest::new("salaries", "salary", "").validate(),
            Err(LookupValidationError::MissingKeyValue)
        );
    }

    #[test]
    fn test_missing_field_reported_before_identifier_check() {
        let request = LookupRequest::new("bad;table", "", 1);
        assert_eq!(
            request.validate(),
            Err(LookupValidationError::MissingKeyColumn)
        );
    }

    #[test]
    fn test_invalid_identifier() {
        let request = LookupRequest::new("salaries", "salary = 1 OR 1", 1);
        assert!(matches!(
            request.validate(),
            Err(LookupValidationError::InvalidIdentifier {
                kind: IdentifierKind::Column,
                ..
            })
        ));
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(parse_key_value("52000"), json!(52000));
        assert_eq!(parse_key_value(" -1 "), json!(-1));
        assert_eq!(parse_key_value("d005"), json!("d005"));
        assert_eq!(parse_key_value("\"52000\""), json!("52000"));
        assert_eq!(parse_key_value("[1,2]"), json!("[1,2]"));
        assert_eq!(parse_key_value("null"), json!("null"));
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let request: LookupRequest = serde_json::from_value(json!({
            "table_name": "salaries",
            "key_column": "salary",
            "key_value": 52000
        }))
        .unwrap();

        assert_eq!(request, LookupRequest::new("salaries", "salary", 52000));
    }
}
