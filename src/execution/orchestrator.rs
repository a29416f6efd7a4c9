//! Execution Orchestrator
//!
//! Runs one panel query with at most one fallback retry:
//! 1. Plan: raw upstream SQL wins over the builder, then the active filter
//!    predicate is injected.
//! 2. Execute against the backend.
//! 3. On a structural failure of raw SQL, synthesize a minimal query from the
//!    panel definition, inject the same predicate and execute once more.
//! 4. Anything else fails with a single combined error.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::execution::backend::QueryBackend;
use crate::execution::classifier::ErrorClassifier;
use crate::model::PanelSpec;
use crate::sql::{inject_filter, QueryBuilder, BASE_TABLE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a planned query came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrigin {
    /// Upstream-generated `sql_query` text
    Raw,
    /// Produced by [`QueryBuilder`]
    Built,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedQuery {
    pub sql: String,
    pub origin: QueryOrigin,
}

/// Successful execution of a panel query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    /// Raw backend response, shape left to the normalizer
    pub response: Value,
    /// SQL that produced `response`
    pub sql: String,
    pub used_fallback: bool,
    /// Message of the failed primary attempt when the fallback answered
    pub primary_error: Option<String>,
}

pub struct QueryOrchestrator {
    backend: Arc<dyn QueryBackend>,
    builder: QueryBuilder,
    classifier: ErrorClassifier,
    fallback_enabled: bool,
    fallback_limit: usize,
}

impl QueryOrchestrator {
    pub fn new(backend: Arc<dyn QueryBackend>, config: &EngineConfig) -> Self {
        Self {
            backend,
            builder: QueryBuilder::new(config.preview_limit),
            classifier: ErrorClassifier::new(),
            fallback_enabled: config.fallback_enabled,
            fallback_limit: config.fallback_limit,
        }
    }

    /// Choose the panel's SQL and inject the filter predicate into it
    pub fn plan(&self, panel: &PanelSpec, predicate: &str) -> PlannedQuery {
        let (sql, origin) = match panel.raw_sql() {
            Some(raw) => (raw.to_string(), QueryOrigin::Raw),
            None => (self.builder.panel_query(panel), QueryOrigin::Built),
        };

        PlannedQuery {
            sql: inject_filter(&sql, predicate),
            origin,
        }
    }

    /// Minimal replacement query for a panel, before filter injection
    pub fn fallback_query(&self, panel: &PanelSpec) -> String {
        match panel {
            PanelSpec::Kpi(_) => format!("SELECT COUNT(*) AS value FROM {}", BASE_TABLE),
            PanelSpec::Chart(chart) => match chart.x_column() {
                Some(x) => format!(
                    "SELECT {x}, COUNT(*) AS count FROM {table} WHERE {x} IS NOT NULL GROUP BY {x} ORDER BY count DESC LIMIT {limit}",
                    x = x,
                    table = BASE_TABLE,
                    limit = self.fallback_limit
                ),
                None => self.builder.sample_query(self.fallback_limit),
            },
        }
    }

    /// Plan and execute one panel
    pub async fn run_panel(
        &self,
        dataset_id: &str,
        panel: &PanelSpec,
        predicate: &str,
    ) -> Result<ExecutionOutcome> {
        let planned = self.plan(panel, predicate);
        self.execute(dataset_id, panel, &planned, predicate).await
    }

    pub async fn execute(
        &self,
        dataset_id: &str,
        panel: &PanelSpec,
        planned: &PlannedQuery,
        predicate: &str,
    ) -> Result<ExecutionOutcome> {
        debug!("Executing {:?} query for panel {}: {}", planned.origin, panel.id(), planned.sql);

        let primary_error = match self.backend.execute(dataset_id, &planned.sql).await {
            Ok(response) => {
                return Ok(ExecutionOutcome {
                    response,
                    sql: planned.sql.clone(),
                    used_fallback: false,
                    primary_error: None,
                })
            }
            Err(e) => e,
        };

        let class = self.classifier.classify(&primary_error);
        let primary_message = primary_error.message();

        let retry = self.fallback_enabled
            && planned.origin == QueryOrigin::Raw
            && class.is_structural();
        if !retry {
            warn!(
                "Query for panel {} failed ({}), no fallback: {}",
                panel.id(),
                class,
                primary_message
            );
            return Err(EngineError::QueryFailed {
                primary: primary_message,
                fallback: None,
            });
        }

        let fallback_sql = inject_filter(&self.fallback_query(panel), predicate);
        info!(
            "Query for panel {} failed with {}, retrying with fallback: {}",
            panel.id(),
            class,
            fallback_sql
        );

        match self.backend.execute(dataset_id, &fallback_sql).await {
            Ok(response) => Ok(ExecutionOutcome {
                response,
                sql: fallback_sql,
                used_fallback: true,
                primary_error: Some(primary_message),
            }),
            Err(fallback_error) => {
                warn!("Fallback query for panel {} also failed", panel.id());
                Err(EngineError::QueryFailed {
                    primary: primary_message,
                    fallback: Some(fallback_error.message()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChartSpec, ChartType, MetricSpec};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Fails any statement containing one of `failing`, records every call
    struct ScriptedBackend {
        failing: Vec<(&'static str, &'static str)>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(failing: Vec<(&'static str, &'static str)>) -> Self {
            Self {
                failing,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn execute(&self, _dataset_id: &str, sql: &str) -> Result<Value> {
            self.calls.lock().unwrap().push(sql.to_string());
            for (needle, message) in &self.failing {
                if sql.contains(needle) {
                    return Err(EngineError::Backend(message.to_string()));
                }
            }
            Ok(json!({ "data": [{ "value": 1 }] }))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn orchestrator(backend: Arc<ScriptedBackend>) -> QueryOrchestrator {
        QueryOrchestrator::new(backend, &EngineConfig::default())
    }

    fn raw_chart(sql: &str) -> PanelSpec {
        PanelSpec::Chart(
            ChartSpec::new("c1", ChartType::Bar)
                .with_axes("region", "revenue")
                .with_sql(sql),
        )
    }

    #[test]
    fn test_plan_prefers_raw_sql() {
        let orch = orchestrator(Arc::new(ScriptedBackend::new(vec![])));
        let planned = orch.plan(&raw_chart("SELECT region FROM dataset"), "year = 2024");
        assert_eq!(planned.origin, QueryOrigin::Raw);
        assert_eq!(
            planned.sql,
            "SELECT region FROM (SELECT * FROM dataset WHERE year = 2024) AS dataset"
        );

        let built = PanelSpec::Kpi(MetricSpec::new("k1", "revenue", "sum"));
        let planned = orch.plan(&built, "");
        assert_eq!(planned.origin, QueryOrigin::Built);
        assert_eq!(planned.sql, "SELECT SUM(revenue) AS value FROM dataset");
    }

    #[test]
    fn test_fallback_queries() {
        let orch = orchestrator(Arc::new(ScriptedBackend::new(vec![])));
        assert_eq!(
            orch.fallback_query(&PanelSpec::Kpi(MetricSpec::new("k", "x", "sum"))),
            "SELECT COUNT(*) AS value FROM dataset"
        );
        assert_eq!(
            orch.fallback_query(&raw_chart("SELECT 1")),
            "SELECT region, COUNT(*) AS count FROM dataset WHERE region IS NOT NULL GROUP BY region ORDER BY count DESC LIMIT 10"
        );
        let no_axes = PanelSpec::Chart(ChartSpec::new("t", ChartType::Table).with_sql("SELECT 1"));
        assert_eq!(orch.fallback_query(&no_axes), "SELECT * FROM dataset LIMIT 10");
    }

    #[tokio::test]
    async fn test_structural_failure_retries_with_filtered_fallback() {
        let backend = Arc::new(ScriptedBackend::new(vec![(
            "revnue",
            "Binder Error: Referenced column \"revnue\" not found in FROM clause!",
        )]));
        let orch = orchestrator(backend.clone());

        let outcome = orch
            .run_panel(
                "ds",
                &raw_chart("SELECT region, SUM(revnue) FROM dataset GROUP BY region"),
                "year = 2024",
            )
            .await
            .unwrap();

        assert!(outcome.used_fallback);
        assert!(outcome.primary_error.unwrap().contains("Binder Error"));
        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].contains("FROM (SELECT * FROM dataset WHERE year = 2024) AS dataset"));
        assert!(calls[1].contains("COUNT(*) AS count"));
    }

    #[tokio::test]
    async fn test_built_query_is_never_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![(
            "SUM(revenue)",
            "Binder Error: column revenue",
        )]));
        let orch = orchestrator(backend.clone());
        let panel = PanelSpec::Kpi(MetricSpec::new("k1", "revenue", "sum"));

        let err = orch.run_panel("ds", &panel, "").await.unwrap_err();
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(err.to_string(), "Query failed: Binder Error: column revenue");
    }

    #[tokio::test]
    async fn test_non_structural_failure_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(vec![("dataset", "permission denied")]));
        let orch = orchestrator(backend.clone());

        let err = orch
            .run_panel("ds", &raw_chart("SELECT * FROM dataset"), "")
            .await
            .unwrap_err();
        assert_eq!(backend.calls().len(), 1);
        assert!(matches!(err, EngineError::QueryFailed { fallback: None, .. }));
    }

    #[tokio::test]
    async fn test_both_attempts_fail_with_combined_error() {
        let backend = Arc::new(ScriptedBackend::new(vec![
            ("SELEC ", "Parser Error: syntax error at or near \"SELEC\""),
            ("COUNT(*)", "IO Error: dataset unavailable"),
        ]));
        let orch = orchestrator(backend.clone());

        let err = orch
            .run_panel("ds", &raw_chart("SELEC region FROM dataset"), "")
            .await
            .unwrap_err();
        assert_eq!(backend.calls().len(), 2);
        let text = err.to_string();
        assert!(text.contains("syntax error at or near"));
        assert!(text.contains("fallback query also failed: IO Error: dataset unavailable"));
    }

    #[tokio::test]
    async fn test_fallback_can_be_disabled() {
        let backend = Arc::new(ScriptedBackend::new(vec![("SELEC ", "syntax error")]));
        let config = EngineConfig {
            fallback_enabled: false,
            ..EngineConfig::default()
        };
        let orch = QueryOrchestrator::new(backend.clone(), &config);

        assert!(orch
            .run_panel("ds", &raw_chart("SELEC region FROM dataset"), "")
            .await
            .is_err());
        assert_eq!(backend.calls().len(), 1);
    }
}
