//! Dashboard model - KPI, chart and filter definitions consumed by the engine

pub mod chart;
pub mod filter;
mod lenient;
pub mod metric;

pub use chart::{ChartSpec, ChartType, SortOrder};
pub use filter::{FilterDeclaration, FilterKind, FilterState};
pub use metric::{Aggregate, MetricSpec};

use serde::{Deserialize, Serialize};

/// Generated dashboard configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardSpec {
    #[serde(default)]
    pub dataset_id: Option<String>,

    #[serde(default)]
    pub kpis: Vec<MetricSpec>,

    #[serde(default)]
    pub charts: Vec<ChartSpec>,

    #[serde(default)]
    pub filters: Vec<FilterDeclaration>,
}

impl DashboardSpec {
    /// Every KPI and chart as a panel, KPIs first
    pub fn panels(&self) -> Vec<PanelSpec> {
        self.kpis
            .iter()
            .cloned()
            .map(PanelSpec::Kpi)
            .chain(self.charts.iter().cloned().map(PanelSpec::Chart))
            .collect()
    }
}

/// One queryable dashboard element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelSpec {
    Kpi(MetricSpec),
    Chart(ChartSpec),
}

impl PanelSpec {
    pub fn id(&self) -> &str {
        match self {
            PanelSpec::Kpi(kpi) => &kpi.id,
            PanelSpec::Chart(chart) => &chart.id,
        }
    }

    /// Raw upstream SQL, if the panel carries any non-blank text
    pub fn raw_sql(&self) -> Option<&str> {
        let sql = match self {
            PanelSpec::Kpi(kpi) => kpi.sql_query.as_deref(),
            PanelSpec::Chart(chart) => chart.sql_query.as_deref(),
        };
        chart::non_blank(sql)
    }
}
