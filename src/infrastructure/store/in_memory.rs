//! In-memory backing store for development and tests

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::store::{values_match, BackingStore, Record, StoreError, UpsertOutcome};

use super::sql::check_identifiers;

/// Tables held as ordered row lists
///
/// Querying a table that was never seeded or written is a query error, like
/// an unknown table on a real server. Upserting into an unknown table
/// creates it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<HashMap<String, Vec<Record>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a table with the given rows
    pub fn with_table(mut self, name: impl Into<String>, rows: Vec<Record>) -> Self {
        if let Ok(tables) = self.tables.get_mut() {
            tables.insert(name.into(), rows);
        }
        self
    }

    /// Loads tables from a JSON document of the form `{"table": [{...}, ...]}`
    pub fn from_json(document: &Value) -> Result<Self, StoreError> {
        let tables = document
            .as_object()
            .ok_or_else(|| StoreError::invalid_input("Seed document must be a JSON object"))?;

        let mut store = Self::new();
        for (name, rows) in tables {
            let rows = rows
                .as_array()
                .ok_or_else(|| {
                    StoreError::invalid_input(format!("Seed table '{}' must be an array", name))
                })?
                .iter()
                .map(|row| {
                    row.as_object().cloned().ok_or_else(|| {
                        StoreError::invalid_input(format!(
                            "Seed rows of '{}' must be JSON objects",
                            name
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            store = store.with_table(name.clone(), rows);
        }

        Ok(store)
    }

    /// Loads a seed file written in the [`InMemoryStore::from_json`] format
    pub fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::unavailable(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let document: Value = serde_json::from_str(&contents).map_err(|e| {
            StoreError::invalid_input(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        Self::from_json(&document)
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock_error() -> StoreError {
        StoreError::unavailable("In-memory store lock poisoned")
    }
}

#[async_trait]
impl BackingStore for InMemoryStore {
    async fn query_equality(
        &self,
        table: &str,
        column: &str,
        value: &Value,
    ) -> Result<Vec<Record>, StoreError> {
        check_identifiers(table, [column])?;

        let tables = self.tables.read().map_err(|_| Self::lock_error())?;
        let rows = tables
            .get(table)
            .ok_or_else(|| StoreError::query(format!("Table '{}' doesn't exist", table)))?;

        if !rows.is_empty() && !rows.iter().any(|row| row.contains_key(column)) {
            return Err(StoreError::query(format!(
                "Unknown column '{}' in '{}'",
                column, table
            )));
        }

        Ok(rows
            .iter()
            .filter(|row| row.get(column).is_some_and(|v| values_match(v, value)))
            .cloned()
            .collect())
    }

    async fn upsert(
        &self,
        table: &str,
        data: &Record,
        key_column: &str,
        key_value: &Value,
    ) -> Result<UpsertOutcome, StoreError> {
        if data.is_empty() {
            return Err(StoreError::invalid_input("Upsert data has no columns"));
        }
        check_identifiers(table, data.keys().map(String::as_str).chain([key_column]))?;

        let mut tables = self.tables.write().map_err(|_| Self::lock_error())?;
        let rows = tables.entry(table.to_string()).or_default();

        let mut updated = false;
        for row in rows.iter_mut() {
            if row.get(key_column).is_some_and(|v| values_match(v, key_value)) {
                for (column, value) in data {
                    row.insert(column.clone(), value.clone());
                }
                updated = true;
            }
        }

        if updated {
            Ok(UpsertOutcome::Updated)
        } else {
            rows.push(data.clone());
            Ok(UpsertOutcome::Inserted)
        }
    }

    async fn close(&self) {}

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn salary(emp_no: i64, salary: i64) -> Record {
        json!({"emp_no": emp_no, "salary": salary, "from_date": "1986-06-26"})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new().with_table(
            "salaries",
            vec![salary(10001, 60117), salary(12345, 52000), salary(20000, 52000)],
        )
    }

    #[tokio::test]
    async fn test_query_equality_returns_matches_in_order() {
        let rows = store()
            .query_equality("salaries", "salary", &json!(52000))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["emp_no"], json!(12345));
        assert_eq!(rows[1]["emp_no"], json!(20000));
    }

    #[tokio::test]
    async fn test_query_equality_matches_textual_key() {
        let rows = store()
            .query_equality("salaries", "salary", &json!("52000"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_query_equality_no_match() {
        let rows = store()
            .query_equality("salaries", "salary", &json!(-1))
            .await
            .unwrap();

        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_table_is_query_error() {
        let err = store()
            .query_equality("nonexistent_table", "salary", &json!(1))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Query { .. }));
    }

    #[tokio::test]
    async fn test_unknown_column_is_query_error() {
        let err = store()
            .query_equality("salaries", "bonus", &json!(1))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Query { .. }));
    }

    #[tokio::test]
    async fn test_upsert_updates_existing_rows() {
        let store = store();
        let mut data = Record::new();
        data.insert("salary".to_string(), json!(70000));

        let outcome = store
            .upsert("salaries", &data, "emp_no", &json!(10001))
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        let rows = store
            .query_equality("salaries", "emp_no", &json!(10001))
            .await
            .unwrap();
        assert_eq!(rows[0]["salary"], json!(70000));
        assert_eq!(store.row_count("salaries"), 3);
    }

    #[tokio::test]
    async fn test_upsert_inserts_missing_row() {
        let store = store();

        let outcome = store
            .upsert("salaries", &salary(30000, 41000), "emp_no", &json!(30000))
            .await
            .unwrap();

        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert_eq!(store.row_count("salaries"), 4);
    }

    #[tokio::test]
    async fn test_upsert_rejects_empty_data() {
        let err = store()
            .upsert("salaries", &Record::new(), "emp_no", &json!(1))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_column_name() {
        let mut data = Record::new();
        data.insert("salary = 0; --".to_string(), json!(1));

        let err = store()
            .upsert("salaries", &data, "emp_no", &json!(1))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidInput { .. }));
    }

    #[test]
    fn test_from_json() {
        let store = InMemoryStore::from_json(&json!({
            "departments": [{"dept_no": "d001", "dept_name": "Marketing"}],
            "salaries": []
        }))
        .unwrap();

        assert_eq!(store.row_count("departments"), 1);
        assert_eq!(store.row_count("salaries"), 0);
    }

    #[test]
    fn test_from_json_rejects_bad_shape() {
        assert!(InMemoryStore::from_json(&json!([1, 2])).is_err());
        assert!(InMemoryStore::from_json(&json!({"t": {"a": 1}})).is_err());
        assert!(InMemoryStore::from_json(&json!({"t": [1]})).is_err());
    }
}
