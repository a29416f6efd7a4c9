//! Filter Clause Builder
//!
//! Converts the active filter state into one boolean predicate. Entries that
//! cannot produce a condition (unknown id, null, empty selection, unparsable
//! bound) are skipped; the builder never fails.

use crate::model::{FilterDeclaration, FilterKind, FilterState};
use crate::sql::format::{format_number, format_value, parse_finite, quote_string};
use itertools::Itertools;
use serde_json::Value;
use tracing::debug;

/// Build the conjunction of all active filter conditions, or "" when none apply
pub fn build_filter_clause(state: &FilterState, catalog: &[FilterDeclaration]) -> String {
    let mut conditions = Vec::new();

    for (filter_id, value) in state.iter() {
        let decl = match catalog.iter().find(|d| &d.id == filter_id) {
            Some(decl) => decl,
            None => {
                debug!("Skipping filter '{}': no declaration", filter_id);
                continue;
            }
        };
        if value.is_null() || decl.column.trim().is_empty() {
            continue;
        }
        conditions.extend(conditions_for(decl, value));
    }

    conditions.join(" AND ")
}

fn conditions_for(decl: &FilterDeclaration, value: &Value) -> Vec<String> {
    let column = decl.column.trim();
    match &decl.kind {
        FilterKind::Categorical | FilterKind::MultiSelect => {
            categorical_condition(column, value).into_iter().collect()
        }
        FilterKind::NumericRange => numeric_range_conditions(column, value),
        FilterKind::DateRange => date_range_condition(column, value).into_iter().collect(),
        FilterKind::Unknown(kind) => {
            debug!("Skipping filter '{}': unsupported type '{}'", decl.id, kind);
            Vec::new()
        }
    }
}

fn categorical_condition(column: &str, value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let literals: Vec<String> = items.iter().filter_map(format_value).collect();
            if literals.is_empty() {
                None
            } else {
                Some(format!("{} IN ({})", column, literals.iter().join(", ")))
            }
        }
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(format!("{} = {}", column, quote_string(s))),
        Value::Number(_) | Value::Bool(_) => {
            format_value(value).map(|literal| format!("{} = {}", column, literal))
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn numeric_range_conditions(column: &str, value: &Value) -> Vec<String> {
    let mut conditions = Vec::new();
    if let Some(min) = value.get("min").and_then(parse_finite) {
        conditions.push(format!("{} >= {}", column, format_number(min)));
    }
    if let Some(max) = value.get("max").and_then(parse_finite) {
        conditions.push(format!("{} <= {}", column, format_number(max)));
    }
    conditions
}

fn date_range_condition(column: &str, value: &Value) -> Option<String> {
    let bound = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let (start, end) = (bound("start")?, bound("end")?);
    Some(format!(
        "{} BETWEEN {} AND {}",
        column,
        quote_string(start),
        quote_string(end)
    ))
}
