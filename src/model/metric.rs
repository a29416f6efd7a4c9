use serde::{Deserialize, Serialize};

/// KPI card definition produced by the suggestion generator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSpec {
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub value_column: String,

    /// sum, avg, count, max, min, percentage, ...
    #[serde(default)]
    pub calculation: String,

    /// currency, percentage, number, ...
    #[serde(default)]
    pub format_type: String,

    /// Raw upstream SQL; when present it replaces the built query
    #[serde(default)]
    pub sql_query: Option<String>,
}

impl MetricSpec {
    pub fn new(id: &str, value_column: &str, calculation: &str) -> Self {
        Self {
            id: id.to_string(),
            name: String::new(),
            value_column: value_column.to_string(),
            calculation: calculation.to_string(),
            format_type: "number".to_string(),
            sql_query: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_format(mut self, format_type: &str) -> Self {
        self.format_type = format_type.to_string();
        self
    }

    pub fn with_sql(mut self, sql: &str) -> Self {
        self.sql_query = Some(sql.to_string());
        self
    }

    /// Calculation token as the suggestion generator normalizes it: lower
    /// case, first word only ("Sum of revenue" -> "sum").
    pub fn calculation_token(&self) -> String {
        self.calculation
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase()
    }

    pub fn is_percentage(&self) -> bool {
        self.format_type.eq_ignore_ascii_case("percentage")
            || self.calculation_token().starts_with("percent")
    }
}

/// Aggregate functions accepted in generated SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregate {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl Aggregate {
    /// Parse an aggregation token against the allow-list, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "sum" => Some(Aggregate::Sum),
            "avg" => Some(Aggregate::Avg),
            "count" => Some(Aggregate::Count),
            "min" => Some(Aggregate::Min),
            "max" => Some(Aggregate::Max),
            _ => None,
        }
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Count => "COUNT",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}
