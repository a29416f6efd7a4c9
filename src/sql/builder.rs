//! Declarative Query Builder
//!
//! Turns KPI and chart definitions into a single `SELECT` over the base
//! table. Every definition, however incomplete, maps to some valid query:
//! unknown calculations and aggregations degrade to `COUNT`, charts without
//! both axes degrade to a row preview.

use crate::model::chart::non_blank;
use crate::model::{Aggregate, ChartSpec, ChartType, MetricSpec, PanelSpec};
use crate::sql::format::quote_string;
use crate::sql::BASE_TABLE;

const CANCELLED_STATUS: &str = "Cancelled";
const CONVERTED_STATUS: &str = "Converted";

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    preview_limit: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self { preview_limit: 100 }
    }
}

impl QueryBuilder {
    pub fn new(preview_limit: usize) -> Self {
        Self { preview_limit }
    }

    /// Build the declarative query for a panel, ignoring any raw SQL it carries
    pub fn panel_query(&self, panel: &PanelSpec) -> String {
        match panel {
            PanelSpec::Kpi(kpi) => self.kpi_query(kpi),
            PanelSpec::Chart(chart) => self.chart_query(chart),
        }
    }

    pub fn kpi_query(&self, kpi: &MetricSpec) -> String {
        let column = kpi.value_column.trim();
        let wildcard = column.is_empty() || column == "*";

        let expr = if kpi.is_percentage() {
            percentage_expr(kpi, column, wildcard)
        } else {
            match Aggregate::from_token(&kpi.calculation_token()) {
                Some(Aggregate::Count) | None => count_expr(column, wildcard),
                // SUM(*) and friends are not valid SQL
                Some(_) if wildcard => count_expr(column, wildcard),
                Some(agg) => format!("{}({})", agg.sql_name(), column),
            }
        };

        format!("SELECT {} AS value FROM {}", expr, BASE_TABLE)
    }

    pub fn chart_query(&self, chart: &ChartSpec) -> String {
        let (x, y) = match (chart.x_column(), chart.y_column()) {
            (Some(x), Some(y)) => (x, y),
            _ => return self.sample_query(self.preview_limit),
        };

        let aggregate = chart
            .aggregation
            .as_deref()
            .and_then(Aggregate::from_token)
            .unwrap_or(Aggregate::Count);
        let alias = value_alias(&chart.chart_type);

        let mut sql = format!(
            "SELECT {}, {}({}) AS {} FROM {} GROUP BY {}",
            x,
            aggregate.sql_name(),
            y,
            alias,
            BASE_TABLE,
            x
        );

        if let Some(sort_by) = non_blank(chart.sort_by.as_deref()) {
            // The raw y column is aggregated away; order by its alias instead
            let sort_column = if sort_by == y { alias } else { sort_by };
            sql.push_str(&format!(
                " ORDER BY {} {}",
                sort_column,
                chart.sort_order.sql_keyword()
            ));
        }

        if let Some(limit) = chart.limit.filter(|l| *l > 0) {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    /// Row preview of the base table
    pub fn sample_query(&self, limit: usize) -> String {
        format!("SELECT * FROM {} LIMIT {}", BASE_TABLE, limit)
    }
}

/// Name of the aggregated column a chart query produces
pub fn value_alias(chart_type: &ChartType) -> &'static str {
    match chart_type {
        ChartType::Pie => "count",
        _ => "value",
    }
}

fn count_expr(column: &str, wildcard: bool) -> String {
    if wildcard {
        "COUNT(*)".to_string()
    } else {
        format!("COUNT({})", column)
    }
}

fn percentage_expr(kpi: &MetricSpec, column: &str, wildcard: bool) -> String {
    let name = kpi.name.to_lowercase();
    let status = if name.contains("cancel") {
        Some(CANCELLED_STATUS)
    } else if name.contains("conversion") {
        Some(CONVERTED_STATUS)
    } else {
        None
    };

    match status {
        Some(status) if !wildcard => format!(
            "COUNT(CASE WHEN {} = {} THEN 1 END) * 100.0 / NULLIF(COUNT(*), 0)",
            column,
            quote_string(status)
        ),
        _ => format!(
            "{} * 100.0 / NULLIF(COUNT(*), 0)",
            count_expr(column, wildcard)
        ),
    }
}
