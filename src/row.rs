//! Flattened result-set rows.
//!
//! Each row maps aliased column names (`{column}_{iteration}`) to scalar
//! values. Rows usually arrive as JSON from a database driver or a fixture:
//!
//! ```json
//! [
//!   {"id_0": 1, "name_0": "ada", "id_1": 10, "title_1": "hello"},
//!   {"id_0": 1, "name_0": "ada", "id_1": 11, "title_1": "again"}
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

use crate::error::{HydrationError, HydrationResult};
use crate::value::Value;

/// A single flattened row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: HashMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column value.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.insert(column.into(), value.into());
    }

    /// Get a column value. `None` means the column is absent, which is
    /// different from a present NULL.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// An ordered sequence of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    rows: Vec<Row>,
}

impl RowSet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Parse a JSON array of flat objects.
    pub fn from_json_str(source: &str) -> HydrationResult<Self> {
        let json: serde_json::Value = serde_json::from_str(source)?;
        Self::from_json(json)
    }

    /// Parse a JSON array of flat objects from a reader.
    pub fn from_json_reader<R: Read>(reader: R) -> HydrationResult<Self> {
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        Self::from_json(json)
    }

    fn from_json(json: serde_json::Value) -> HydrationResult<Self> {
        let serde_json::Value::Array(items) = json else {
            return Err(HydrationError::InvalidRows(
                "expected a JSON array of row objects".to_string(),
            ));
        };

        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let serde_json::Value::Object(object) = item else {
                return Err(HydrationError::InvalidRows(format!(
                    "row {} is not an object",
                    index
                )));
            };

            let mut row = Row::new();
            for (column, raw) in object {
                let value: Value = serde_json::from_value(raw).map_err(|_| {
                    HydrationError::InvalidRows(format!(
                        "row {}, column '{}': nested values are not supported",
                        index, column
                    ))
                })?;
                row.insert(column, value);
            }
            rows.push(row);
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl From<Vec<Row>> for RowSet {
    fn from(rows: Vec<Row>) -> Self {
        Self::new(rows)
    }
}
