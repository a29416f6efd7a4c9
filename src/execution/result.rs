//! Tabular Result - column names plus row objects

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

/// Rows as returned by a backend or produced by normalization
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Response body in the analytics API shape:
    /// `{columns, data, row_count, query}`
    pub fn to_response(&self, query: &str) -> Value {
        serde_json::json!({
            "columns": self.columns,
            "data": self.rows,
            "row_count": self.row_count,
            "query": query,
        })
    }
}
