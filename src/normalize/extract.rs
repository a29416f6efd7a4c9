//! Row extraction and cell cleaning
//!
//! Backends answer in several shapes: a bare array, `{data: [...]}`,
//! `{results: {data: [...]}}`, `{result: {data: [...]}}` or
//! `{results: [...]}`. The first array found, in that order, holds the rows.

use crate::execution::result::Row;
use serde_json::{Number, Value};

/// JSON pointers probed after the bare-array case, in priority order
const ROW_POINTERS: &[(&str, &str)] = &[
    ("/data", "/columns"),
    ("/results/data", "/results/columns"),
    ("/result/data", "/result/columns"),
    ("/results", "/columns"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
}

/// Find the row array in a backend response, or `None` when no known shape
/// matches
pub fn extract_rows(raw: &Value) -> Option<Extracted> {
    let (items, declared) = match raw {
        Value::Array(items) => (items, None),
        _ => ROW_POINTERS.iter().find_map(|(rows_ptr, columns_ptr)| {
            raw.pointer(rows_ptr)
                .and_then(Value::as_array)
                .map(|items| (items, raw.pointer(columns_ptr).and_then(column_names)))
        })?,
    };

    let declared = declared.unwrap_or_default();
    let rows: Vec<Row> = items.iter().map(|item| to_row(item, &declared)).collect();
    let columns = merge_columns(declared, &rows);

    Some(Extracted { rows, columns })
}

fn column_names(value: &Value) -> Option<Vec<String>> {
    let names: Vec<String> = value
        .as_array()?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

/// Objects pass through, positional arrays are zipped with the declared
/// columns and bare scalars become a single `value` cell
fn to_row(item: &Value, columns: &[String]) -> Row {
    match item {
        Value::Object(map) => map.clone(),
        Value::Array(cells) if !columns.is_empty() => columns
            .iter()
            .cloned()
            .zip(cells.iter().cloned())
            .collect(),
        other => {
            let mut row = Row::new();
            row.insert("value".to_string(), other.clone());
            row
        }
    }
}

/// Declared columns first, then any further keys in first-seen order
fn merge_columns(mut columns: Vec<String>, rows: &[Row]) -> Vec<String> {
    for row in rows {
        for key in row.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Turn a numeric-looking string into a JSON number; integers stay integral
pub fn coerce_numeric(value: &Value) -> Option<Value> {
    let text = value.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::Number(i.into()));
    }

    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Null, missing and whitespace-only cells count as blank
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}
