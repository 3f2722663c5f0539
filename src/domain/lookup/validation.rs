//! Lookup request validation utilities

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Maximum length of a single identifier segment (MySQL limit)
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Table and column names: one optional schema qualifier, no quoting
static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("identifier pattern is valid")
});

/// Which part of a request an identifier belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Table,
    Column,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table => write!(f, "table name"),
            Self::Column => write!(f, "column name"),
        }
    }
}

/// Lookup validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum LookupValidationError {
    /// Table name is empty or blank
    MissingTableName,
    /// Key column is empty or blank
    MissingKeyColumn,
    /// Key value is null or a blank string
    MissingKeyValue,
    /// Key value is an array or object
    UnsupportedKeyValue { kind: &'static str },
    /// Identifier fails the allow-list
    InvalidIdentifier { kind: IdentifierKind, value: String },
}

impl fmt::Display for LookupValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTableName => write!(f, "Table name not provided"),
            Self::MissingKeyColumn => write!(f, "Key column not provided"),
            Self::MissingKeyValue => write!(f, "Key value not provided"),
            Self::UnsupportedKeyValue { kind } => {
                write!(f, "Key value must be a scalar, got {}", kind)
            }
            Self::InvalidIdentifier { kind, value } => write!(
                f,
                "Invalid {} '{}': only letters, digits and underscores are allowed (max {} characters per segment)",
                kind, value, MAX_IDENTIFIER_LENGTH
            ),
        }
    }
}

impl std::error::Error for LookupValidationError {}

/// Checks a table or column name against the identifier allow-list
///
/// Identifiers cannot be bound as query parameters, so anything that reaches
/// SQL text has to pass this first.
pub fn validate_identifier(kind: IdentifierKind, value: &str) -> Result<(), LookupValidationError> {
    let valid = IDENTIFIER_PATTERN.is_match(value)
        && value
            .split('.')
            .all(|segment| segment.len() <= MAX_IDENTIFIER_LENGTH);

    if valid {
        Ok(())
    } else {
        Err(LookupValidationError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Renders a key value the way it appears inside a cache key
///
/// Strings are used as-is, other scalars use their JSON text, so `52000`
/// and `"52000"` land on the same key. Returns an error for null, blank
/// strings and non-scalars.
pub fn key_value_text(value: &Value) -> Result<String, LookupValidationError> {
    match value {
        Value::Null => Err(LookupValidationError::MissingKeyValue),
        Value::String(s) if s.trim().is_empty() => Err(LookupValidationError::MissingKeyValue),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) => Err(LookupValidationError::UnsupportedKeyValue { kind: "array" }),
        Value::Object(_) => Err(LookupValidationError::UnsupportedKeyValue { kind: "object" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier(IdentifierKind::Table, "salaries").is_ok());
        assert!(validate_identifier(IdentifierKind::Table, "employees.salaries").is_ok());
        assert!(validate_identifier(IdentifierKind::Column, "emp_no").is_ok());
        assert!(validate_identifier(IdentifierKind::Column, "_hidden2").is_ok());
    }

    #[test]
    fn test_injection_attempts_rejected() {
        for value in [
            "salaries; DROP TABLE salaries",
            "salaries WHERE 1=1 --",
            "`salaries`",
            "\"salaries\"",
            "a.b.c",
            "1salaries",
            "sal aries",
            "",
        ] {
            let result = validate_identifier(IdentifierKind::Table, value);
            assert!(result.is_err(), "expected '{}' to be rejected", value);
        }
    }

    #[test]
    fn test_identifier_too_long() {
        let long = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        let err = validate_identifier(IdentifierKind::Column, &long).unwrap_err();

        assert!(matches!(
            err,
            LookupValidationError::InvalidIdentifier {
                kind: IdentifierKind::Column,
                ..
            }
        ));
    }

    #[test]
    fn test_key_value_text() {
        assert_eq!(key_value_text(&json!(52000)).unwrap(), "52000");
        assert_eq!(key_value_text(&json!("52000")).unwrap(), "52000");
        assert_eq!(key_value_text(&json!(-1)).unwrap(), "-1");
        assert_eq!(key_value_text(&json!(0)).unwrap(), "0");
        assert_eq!(key_value_text(&json!(true)).unwrap(), "true");
        assert_eq!(key_value_text(&json!("d005")).unwrap(), "d005");
    }

    #[test]
    fn test_key_value_text_rejects_missing() {
        assert_eq!(
            key_value_text(&Value::Null),
            Err(LookupValidationError::MissingKeyValue)
        );
        assert_eq!(
            key_value_text(&json!("   ")),
            Err(LookupValidationError::MissingKeyValue)
        );
        assert!(matches!(
            key_value_text(&json!([1, 2])),
            Err(LookupValidationError::UnsupportedKeyValue { kind: "array" })
        ));
    }

    #[test]
    fn test_error_display() {
        let err = LookupValidationError::InvalidIdentifier {
            kind: IdentifierKind::Table,
            value: "x;y".to_string(),
        };
        assert!(err.to_string().starts_with("Invalid table name 'x;y'"));
        assert_eq!(
            LookupValidationError::MissingKeyColumn.to_string(),
            "Key column not provided"
        );
    }
}
