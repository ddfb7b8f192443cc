//! Row and record-set types for query results.

use std::collections::HashMap;
use std::ops::AddAssign;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::AppError;

/// Parameters for Cypher statements.
///
/// A map of parameter names to JSON values that can be passed to statements.
pub type Params = HashMap<String, JsonValue>;

/// A single row from a query result.
///
/// Contains column values as JSON, with typed extraction via [`Row::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    /// Creates a new row from a map of column names to values.
    pub fn new(data: HashMap<String, JsonValue>) -> Self {
        Self { data }
    }

    /// Gets a value from the row by column name, deserializing to the requested type.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not found or if deserialization fails.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let id: i64 = row.get("db_id")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, AppError> {
        self.data
            .get(key)
            .ok_or_else(|| AppError::Decode(format!("column not found: {}", key)))
            .and_then(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| AppError::Decode(format!("failed to deserialize '{}': {}", key, e)))
            })
    }

    /// Returns a map-valued column as a property map.
    pub fn get_map(&self, key: &str) -> Result<serde_json::Map<String, JsonValue>, AppError> {
        match self.data.get(key) {
            Some(JsonValue::Object(map)) => Ok(map.clone()),
            Some(other) => Err(AppError::Decode(format!(
                "column '{}' is not a map: {}",
                key, other
            ))),
            None => Err(AppError::Decode(format!("column not found: {}", key))),
        }
    }

    /// Consumes the row and returns the underlying data map.
    pub fn into_inner(self) -> HashMap<String, JsonValue> {
        self.data
    }
}

impl From<HashMap<String, JsonValue>> for Row {
    fn from(data: HashMap<String, JsonValue>) -> Self {
        Self::new(data)
    }
}

/// Update counters reported for one statement.
///
/// Field names follow the database's HTTP statistics payload; note the
/// singular `relationship_deleted` key it uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryStats {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub relationships_created: u64,
    #[serde(alias = "relationship_deleted")]
    pub relationships_deleted: u64,
    pub properties_set: u64,
}

impl AddAssign for QueryStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes_created += rhs.nodes_created;
        self.nodes_deleted += rhs.nodes_deleted;
        self.relationships_created += rhs.relationships_created;
        self.relationships_deleted += rhs.relationships_deleted;
        self.properties_set += rhs.properties_set;
    }
}

/// The materialized result of one successful statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Row>,
    stats: QueryStats,
}

impl RecordSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            stats: QueryStats::default(),
        }
    }

    /// Builds a record set by zipping column names with positional row values.
    ///
    /// Rows shorter than `columns` leave the missing columns absent.
    pub fn from_positional(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values)
                    .collect::<HashMap<_, _>>()
                    .into()
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn with_stats(mut self, stats: QueryStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn stats(&self) -> QueryStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}
