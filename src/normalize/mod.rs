//! Result Normalizer
//!
//! Converts whatever a backend returned into a render-safe [`TabularResult`]
//! plus advisory warnings. Normalization never fails: unknown shapes come
//! back as an empty, invalid outcome and zero rows are valid.
//!
//! Stages run in a fixed order: extract rows, resolve the axis columns,
//! clean cells (coerce then drop blank rows), check emptiness, then attach
//! chart-specific advisories.

pub mod extract;

use crate::config::EngineConfig;
use crate::execution::result::{Row, TabularResult};
use crate::model::{ChartSpec, ChartType, MetricSpec, PanelSpec};
use crate::sql::builder::value_alias;
use extract::{coerce_numeric, extract_rows, is_blank};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

pub const NO_DATA_WARNING: &str = "No data available to display";
pub const UNRECOGNIZED_SHAPE_WARNING: &str = "Unrecognized response format";

/// What the renderer will draw, reduced to what normalization needs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderSpec {
    pub chart_type: Option<ChartType>,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
}

impl From<&ChartSpec> for RenderSpec {
    fn from(chart: &ChartSpec) -> Self {
        Self {
            chart_type: Some(chart.chart_type.clone()),
            x_axis: chart.x_column().map(str::to_string),
            y_axis: chart.y_column().map(str::to_string),
        }
    }
}

impl From<&MetricSpec> for RenderSpec {
    fn from(_: &MetricSpec) -> Self {
        Self::default()
    }
}

impl From<&PanelSpec> for RenderSpec {
    fn from(panel: &PanelSpec) -> Self {
        match panel {
            PanelSpec::Kpi(kpi) => kpi.into(),
            PanelSpec::Chart(chart) => chart.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub data: TabularResult,
    /// Category column actually used after fallback
    pub x_column: Option<String>,
    /// Value column actually used after fallback
    pub y_column: Option<String>,
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    pub fn warning(&self) -> Option<&str> {
        self.warnings.first().map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct ResultNormalizer {
    pie_max_categories: usize,
    line_max_points: usize,
}

impl Default for ResultNormalizer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ResultNormalizer {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            pie_max_categories: config.pie_max_categories,
            line_max_points: config.line_max_points,
        }
    }

    pub fn normalize(&self, raw: Option<&Value>, spec: &RenderSpec) -> ValidationOutcome {
        let raw = match raw {
            None | Some(Value::Null) => return empty_outcome(true, vec![NO_DATA_WARNING]),
            Some(raw) => raw,
        };

        let extracted = match extract_rows(raw) {
            Some(extracted) => extracted,
            None => {
                debug!("No row array found in backend response");
                return empty_outcome(false, vec![UNRECOGNIZED_SHAPE_WARNING, NO_DATA_WARNING]);
            }
        };
        let columns = extracted.columns;
        let mut rows = extracted.rows;

        let y_column = spec.y_axis.as_deref().map(|y| {
            resolve_value_column(
                y,
                spec.x_axis.as_deref(),
                spec.chart_type.as_ref(),
                &columns,
                &rows,
            )
        });
        let x_column = spec
            .x_axis
            .as_deref()
            .map(|x| resolve_category_column(x, y_column.as_deref(), &columns));

        // Only axes the result actually carries can blank out a row
        let axes: Vec<&str> = x_column
            .iter()
            .chain(y_column.iter())
            .map(String::as_str)
            .filter(|axis| columns.iter().any(|c| c == axis))
            .collect();
        for row in rows.iter_mut() {
            for axis in &axes {
                if let Some(number) = row.get(*axis).and_then(coerce_numeric) {
                    row.insert(axis.to_string(), number);
                }
            }
        }

        let before = rows.len();
        rows.retain(|row| axes.iter().all(|axis| !is_blank(row.get(*axis))));
        if rows.len() < before {
            debug!("Dropped {} rows with blank axis values", before - rows.len());
        }

        let mut warnings = Vec::new();
        if rows.is_empty() {
            warnings.push(NO_DATA_WARNING.to_string());
        } else if let Some(chart_type) = &spec.chart_type {
            warnings.extend(self.advisories(chart_type, spec, x_column.as_deref(), &rows));
        }

        ValidationOutcome {
            valid: true,
            data: TabularResult::new(columns, rows),
            x_column,
            y_column,
            warnings,
        }
    }

    fn advisories(
        &self,
        chart_type: &ChartType,
        spec: &RenderSpec,
        x_column: Option<&str>,
        rows: &[Row],
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        match chart_type {
            ChartType::Pie => match x_column {
                None => warnings.push("Pie chart needs a category (x-axis) column".to_string()),
                Some(x) => {
                    let categories: HashSet<String> = rows
                        .iter()
                        .filter_map(|row| row.get(x))
                        .map(Value::to_string)
                        .collect();
                    if categories.len() > self.pie_max_categories {
                        warnings.push(format!(
                            "Pie chart has {} categories and may be crowded; consider a bar chart",
                            categories.len()
                        ));
                    }
                }
            },
            ChartType::Scatter if spec.x_axis.is_none() || spec.y_axis.is_none() => {
                warnings.push("Scatter plot needs both x and y axes".to_string());
            }
            ChartType::Line if rows.len() > self.line_max_points => {
                warnings.push(format!(
                    "Line chart has {} points and may be crowded",
                    rows.len()
                ));
            }
            _ => {}
        }

        if rows.len() == 1 {
            warnings.push("Only one data point available; chart may be limited".to_string());
        }

        warnings
    }
}

fn empty_outcome(valid: bool, warnings: Vec<&str>) -> ValidationOutcome {
    ValidationOutcome {
        valid,
        data: TabularResult::empty(),
        x_column: None,
        y_column: None,
        warnings: warnings.into_iter().map(str::to_string).collect(),
    }
}

/// Configured y if the result has it, else the aggregate alias the builder
/// or fallback would have produced. Custom SQL with its own aliases falls
/// through to the first numeric column that is not the category.
fn resolve_value_column(
    y: &str,
    x: Option<&str>,
    chart_type: Option<&ChartType>,
    columns: &[String],
    rows: &[Row],
) -> String {
    if columns.is_empty() || columns.iter().any(|c| c == y) {
        return y.to_string();
    }

    let alias = chart_type.map(value_alias).unwrap_or("value");
    let candidates = columns.iter().filter(|c| Some(c.as_str()) != x);
    let resolved = [alias, "count", "value"]
        .into_iter()
        .find(|candidate| columns.iter().any(|c| c == candidate))
        .map(str::to_string)
        .or_else(|| {
            candidates
                .clone()
                .find(|c| first_present(rows, c).and_then(coerce_numeric).is_some())
                .cloned()
        })
        .or_else(|| candidates.clone().next().cloned());

    match resolved {
        Some(resolved) => {
            debug!("Value column {} not in result, using {}", y, resolved);
            resolved
        }
        None => y.to_string(),
    }
}

fn first_present<'a>(rows: &'a [Row], column: &str) -> Option<&'a Value> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .find(|value| !value.is_null())
}

/// Configured x if the result has it, else the first other column
fn resolve_category_column(x: &str, y: Option<&str>, columns: &[String]) -> String {
    if columns.is_empty() || columns.iter().any(|c| c == x) {
        return x.to_string();
    }

    match columns.iter().find(|c| Some(c.as_str()) != y) {
        Some(first) => {
            debug!("Category column {} not in result, using {}", x, first);
            first.clone()
        }
        None => x.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart(chart_type: ChartType, x: &str, y: &str) -> RenderSpec {
        RenderSpec::from(&ChartSpec::new("c", chart_type).with_axes(x, y))
    }

    #[test]
    fn test_empty_array_is_valid_with_warning() {
        let outcome = ResultNormalizer::default()
            .normalize(Some(&json!([])), &RenderSpec::default());
        assert!(outcome.valid);
        assert!(outcome.data.rows.is_empty());
        assert_eq!(outcome.warning(), Some(NO_DATA_WARNING));
    }

    #[test]
    fn test_absent_response_is_valid_and_empty() {
        let normalizer = ResultNormalizer::default();
        let outcome = normalizer.normalize(None, &RenderSpec::default());
        assert!(outcome.valid);
        assert_eq!(outcome.warning(), Some(NO_DATA_WARNING));

        let outcome = normalizer.normalize(Some(&Value::Null), &RenderSpec::default());
        assert!(outcome.valid);
    }

    #[test]
    fn test_unrecognized_shape_is_invalid_but_render_safe() {
        let outcome = ResultNormalizer::default()
            .normalize(Some(&json!({ "status": "ok" })), &RenderSpec::default());
        assert!(!outcome.valid);
        assert!(outcome.data.rows.is_empty());
        assert!(outcome.warnings.contains(&NO_DATA_WARNING.to_string()));
    }

    #[test]
    fn test_numeric_strings_in_axes_are_coerced() {
        let raw = json!({ "data": [{ "month": "Jan", "revenue": "42.5", "note": "12" }] });
        let outcome = ResultNormalizer::default()
            .normalize(Some(&raw), &chart(ChartType::Bar, "month", "revenue"));
        let row = &outcome.data.rows[0];
        assert_eq!(row["revenue"], json!(42.5));
        assert_eq!(row["month"], json!("Jan"));
        // Only configured axes are touched
        assert_eq!(row["note"], json!("12"));
    }

    #[test]
    fn test_rows_with_blank_axes_are_dropped_before_emptiness_check() {
        let raw = json!([
            { "region": "EU", "value": 3 },
            { "region": "  ", "value": 4 },
            { "region": null, "value": 5 },
            { "value": 6 },
            { "region": "US", "value": null }
        ]);
        let outcome = ResultNormalizer::default()
            .normalize(Some(&raw), &chart(ChartType::Bar, "region", "value"));
        assert_eq!(outcome.data.row_count, 1);
        assert_eq!(outcome.data.rows[0]["region"], json!("EU"));

        let blank_only = json!([{ "region": "", "value": 1 }]);
        let outcome = ResultNormalizer::default()
            .normalize(Some(&blank_only), &chart(ChartType::Bar, "region", "value"));
        assert!(outcome.valid);
        assert_eq!(outcome.warning(), Some(NO_DATA_WARNING));
    }

    #[test]
    fn test_missing_axis_names_fall_back() {
        // Fallback queries answer with `<x>, count`
        let raw = json!({
            "columns": ["region", "count"],
            "data": [{ "region": "EU", "count": 3 }, { "region": "US", "count": 2 }]
        });
        let outcome = ResultNormalizer::default()
            .normalize(Some(&raw), &chart(ChartType::Bar, "month", "revenue"));
        assert_eq!(outcome.y_column.as_deref(), Some("count"));
        assert_eq!(outcome.x_column.as_deref(), Some("region"));
        assert_eq!(outcome.data.row_count, 2);
    }

    #[test]
    fn test_custom_aliases_resolve_to_numeric_column() {
        let raw = json!({
            "columns": ["region", "total"],
            "data": [{ "region": "EU", "total": 15 }, { "region": "US", "total": "20" }]
        });
        let outcome = ResultNormalizer::default()
            .normalize(Some(&raw), &chart(ChartType::Bar, "region", "revenue"));
        assert_eq!(outcome.y_column.as_deref(), Some("total"));
        assert_eq!(outcome.x_column.as_deref(), Some("region"));
        assert_eq!(outcome.data.row_count, 2);
        assert_eq!(outcome.data.rows[1]["total"], json!(20));
    }

    #[test]
    fn test_text_only_result_keeps_rows() {
        let raw = json!({
            "columns": ["region", "label"],
            "data": [{ "region": "EU", "label": "north" }, { "region": "US", "label": "west" }]
        });
        let outcome = ResultNormalizer::default()
            .normalize(Some(&raw), &chart(ChartType::Bar, "region", "revenue"));
        assert_eq!(outcome.y_column.as_deref(), Some("label"));
        assert_eq!(outcome.data.row_count, 2);

        let single = json!({ "columns": ["region"], "data": [{ "region": "EU" }] });
        let outcome = ResultNormalizer::default()
            .normalize(Some(&single), &chart(ChartType::Bar, "region", "revenue"));
        assert_eq!(outcome.y_column.as_deref(), Some("revenue"));
        assert_eq!(outcome.data.row_count, 1);
    }

    #[test]
    fn test_builder_alias_is_found_for_value_column() {
        let raw = json!([{ "month": "Jan", "value": 10 }, { "month": "Feb", "value": 12 }]);
        let outcome = ResultNormalizer::default()
            .normalize(Some(&raw), &chart(ChartType::Line, "month", "revenue"));
        assert_eq!(outcome.y_column.as_deref(), Some("value"));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_pie_advisories() {
        let normalizer = ResultNormalizer::default();
        let rows: Vec<Value> = (0..25)
            .map(|i| json!({ "cat": format!("c{}", i), "count": i + 1 }))
            .collect();
        let outcome = normalizer
            .normalize(Some(&Value::Array(rows)), &chart(ChartType::Pie, "cat", "count"));
        assert!(outcome.warning().unwrap().contains("25 categories"));

        let no_x = RenderSpec {
            chart_type: Some(ChartType::Pie),
            x_axis: None,
            y_axis: Some("count".to_string()),
        };
        let outcome = normalizer.normalize(Some(&json!([{ "count": 1 }, { "count": 2 }])), &no_x);
        assert_eq!(outcome.warning(), Some("Pie chart needs a category (x-axis) column"));
    }

    #[test]
    fn test_scatter_and_line_advisories() {
        let normalizer = ResultNormalizer::default();
        let scatter = RenderSpec {
            chart_type: Some(ChartType::Scatter),
            x_axis: Some("a".to_string()),
            y_axis: None,
        };
        let outcome = normalizer.normalize(Some(&json!([{ "a": 1 }, { "a": 2 }])), &scatter);
        assert_eq!(outcome.warning(), Some("Scatter plot needs both x and y axes"));

        let rows: Vec<Value> = (0..101).map(|i| json!({ "t": i, "value": i })).collect();
        let outcome = normalizer
            .normalize(Some(&Value::Array(rows)), &chart(ChartType::Line, "t", "value"));
        assert_eq!(outcome.warning(), Some("Line chart has 101 points and may be crowded"));
    }

    #[test]
    fn test_single_point_advisory() {
        let raw = json!([{ "m": "Jan", "value": 1 }]);
        let outcome = ResultNormalizer::default()
            .normalize(Some(&raw), &chart(ChartType::Bar, "m", "value"));
        assert_eq!(
            outcome.warning(),
            Some("Only one data point available; chart may be limited")
        );
    }

    #[test]
    fn test_kpi_rows_pass_through() {
        let kpi = MetricSpec::new("k", "revenue", "sum");
        let outcome = ResultNormalizer::default().normalize(
            Some(&json!({ "data": [{ "value": "1200" }] })),
            &RenderSpec::from(&kpi),
        );
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.data.rows[0]["value"], json!("1200"));
    }
}
