use super::lenient::{null_as_default, row_limit};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChartType {
    Line,
    Bar,
    Pie,
    Scatter,
    Histogram,
    Heatmap,
    Funnel,
    Gauge,
    Table,
    /// Unrecognized kinds render with bar semantics
    Other(String),
}

impl Default for ChartType {
    fn default() -> Self {
        ChartType::Bar
    }
}

impl From<String> for ChartType {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "line" => ChartType::Line,
            "bar" => ChartType::Bar,
            "pie" => ChartType::Pie,
            "scatter" => ChartType::Scatter,
            "histogram" => ChartType::Histogram,
            "heatmap" => ChartType::Heatmap,
            "funnel" => ChartType::Funnel,
            "gauge" => ChartType::Gauge,
            "table" => ChartType::Table,
            _ => ChartType::Other(raw),
        }
    }
}

impl From<ChartType> for String {
    fn from(kind: ChartType) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartType::Line => write!(f, "line"),
            ChartType::Bar => write!(f, "bar"),
            ChartType::Pie => write!(f, "pie"),
            ChartType::Scatter => write!(f, "scatter"),
            ChartType::Histogram => write!(f, "histogram"),
            ChartType::Heatmap => write!(f, "heatmap"),
            ChartType::Funnel => write!(f, "funnel"),
            ChartType::Gauge => write!(f, "gauge"),
            ChartType::Table => write!(f, "table"),
            ChartType::Other(raw) => write!(f, "{}", raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

impl From<String> for SortOrder {
    fn from(raw: String) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }
}

impl From<SortOrder> for String {
    fn from(order: SortOrder) -> Self {
        order.sql_keyword().to_lowercase()
    }
}

impl SortOrder {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Chart definition produced by the suggestion generator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    pub id: String,

    #[serde(default, alias = "type", deserialize_with = "null_as_default")]
    pub chart_type: ChartType,

    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default)]
    pub x_axis: Option<String>,

    #[serde(default)]
    pub y_axis: Option<String>,

    #[serde(default)]
    pub aggregation: Option<String>,

    #[serde(default)]
    pub sort_by: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sort_order: SortOrder,

    #[serde(default, deserialize_with = "row_limit")]
    pub limit: Option<u64>,

    #[serde(default)]
    pub sql_query: Option<String>,
}

impl ChartSpec {
    pub fn new(id: &str, chart_type: ChartType) -> Self {
        Self {
            id: id.to_string(),
            chart_type,
            title: String::new(),
            x_axis: None,
            y_axis: None,
            aggregation: None,
            sort_by: None,
            sort_order: SortOrder::Desc,
            limit: None,
            sql_query: None,
        }
    }

    pub fn with_axes(mut self, x_axis: &str, y_axis: &str) -> Self {
        self.x_axis = Some(x_axis.to_string());
        self.y_axis = Some(y_axis.to_string());
        self
    }

    pub fn with_aggregation(mut self, aggregation: &str) -> Self {
        self.aggregation = Some(aggregation.to_string());
        self
    }

    pub fn with_sort(mut self, sort_by: &str, sort_order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.to_string());
        self.sort_order = sort_order;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sql(mut self, sql: &str) -> Self {
        self.sql_query = Some(sql.to_string());
        self
    }

    /// Configured x axis, ignoring blank names
    pub fn x_column(&self) -> Option<&str> {
        non_blank(self.x_axis.as_deref())
    }

    /// Configured y axis, ignoring blank names
    pub fn y_column(&self) -> Option<&str> {
        non_blank(self.y_axis.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_type_accepts_type_alias() {
        let chart: ChartSpec = serde_json::from_str(
            r#"{"id": "c1", "type": "Pie", "x_axis": "region", "sort_order": "asc"}"#,
        )
        .unwrap();
        assert_eq!(chart.chart_type, ChartType::Pie);
        assert_eq!(chart.sort_order, SortOrder::Asc);
        assert_eq!(chart.x_column(), Some("region"));
        assert_eq!(chart.y_column(), None);
    }

    #[test]
    fn test_unknown_chart_type_is_preserved() {
        let chart: ChartSpec =
            serde_json::from_str(r#"{"id": "c1", "chart_type": "sankey"}"#).unwrap();
        assert_eq!(chart.chart_type, ChartType::Other("sankey".to_string()));
        assert_eq!(chart.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_null_and_loose_fields_fall_back_to_defaults() {
        let chart: ChartSpec = serde_json::from_str(
            r#"{"id": "c1", "type": null, "title": null, "sort_order": null, "limit": 10.0}"#,
        )
        .unwrap();
        assert_eq!(chart.chart_type, ChartType::default());
        assert_eq!(chart.title, "");
        assert_eq!(chart.sort_order, SortOrder::Desc);
        assert_eq!(chart.limit, Some(10));

        let chart: ChartSpec =
            serde_json::from_str(r#"{"id": "c2", "limit": "25"}"#).unwrap();
        assert_eq!(chart.limit, Some(25));

        let chart: ChartSpec =
            serde_json::from_str(r#"{"id": "c3", "limit": null}"#).unwrap();
        assert_eq!(chart.limit, None);

        let chart: ChartSpec =
            serde_json::from_str(r#"{"id": "c4", "limit": "top ten"}"#).unwrap();
        assert_eq!(chart.limit, None);
    }

    #[test]
    fn test_blank_axis_counts_as_missing() {
        let chart = ChartSpec::new("c1", ChartType::Bar).with_axes("  ", "revenue");
        assert_eq!(chart.x_column(), None);
        assert_eq!(chart.y_column(), Some("revenue"));
    }
}
