use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterKind {
    DateRange,
    Categorical,
    NumericRange,
    MultiSelect,
    /// Kinds this engine does not know how to turn into a predicate
    Unknown(String),
}

impl From<String> for FilterKind {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "date_range" => FilterKind::DateRange,
            "categorical" => FilterKind::Categorical,
            "numeric_range" => FilterKind::NumericRange,
            "multi_select" => FilterKind::MultiSelect,
            _ => FilterKind::Unknown(raw),
        }
    }
}

impl From<FilterKind> for String {
    fn from(kind: FilterKind) -> Self {
        match kind {
            FilterKind::DateRange => "date_range".to_string(),
            FilterKind::Categorical => "categorical".to_string(),
            FilterKind::NumericRange => "numeric_range".to_string(),
            FilterKind::MultiSelect => "multi_select".to_string(),
            FilterKind::Unknown(raw) => raw,
        }
    }
}

/// Static filter catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterDeclaration {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub column: String,

    #[serde(rename = "type")]
    pub kind: FilterKind,
}

impl FilterDeclaration {
    pub fn new(id: &str, column: &str, kind: FilterKind) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            column: column.to_string(),
            kind,
        }
    }
}

/// Active filter values keyed by filter id.
///
/// Values keep their JSON shape; the declaration's kind decides how a value
/// is read (string, array of strings, `{min, max}`, `{start, end}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FilterState {
    values: BTreeMap<String, Value>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, filter_id: &str, value: Value) {
        self.values.insert(filter_id.to_string(), value);
    }

    pub fn with(mut self, filter_id: &str, value: Value) -> Self {
        self.set(filter_id, value);
        self
    }

    pub fn get(&self, filter_id: &str) -> Option<&Value> {
        self.values.get(filter_id)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}
