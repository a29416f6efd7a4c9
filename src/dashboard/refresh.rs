//! Dashboard refresh
//!
//! Issues every KPI and chart query of a dashboard concurrently, waits for
//! all of them to settle and publishes the whole result set at once.

use crate::dashboard::state::DashboardState;
use crate::execution::QueryOrchestrator;
use crate::model::{DashboardSpec, FilterState, PanelSpec};
use crate::normalize::{RenderSpec, ResultNormalizer, ValidationOutcome};
use crate::sql::build_filter_clause;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PanelStatus {
    Ready { outcome: ValidationOutcome },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelResult {
    pub id: String,
    /// SQL that produced the data, absent when every attempt failed
    pub sql: Option<String>,
    pub used_fallback: bool,
    pub status: PanelStatus,
}

impl PanelResult {
    pub fn is_ready(&self) -> bool {
        matches!(self.status, PanelStatus::Ready { .. })
    }

    pub fn outcome(&self) -> Option<&ValidationOutcome> {
        match &self.status {
            PanelStatus::Ready { outcome } => Some(outcome),
            PanelStatus::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            PanelStatus::Failed { error } => Some(error),
            PanelStatus::Ready { .. } => None,
        }
    }

    fn failed(id: &str, error: String) -> Self {
        Self {
            id: id.to_string(),
            sql: None,
            used_fallback: false,
            status: PanelStatus::Failed { error },
        }
    }
}

/// Results of one fully settled refresh, keyed by panel id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshSnapshot {
    pub refresh_id: Uuid,
    pub generation: u64,
    pub dataset_id: String,
    pub completed_at: DateTime<Utc>,
    pub panels: BTreeMap<String, PanelResult>,
}

impl RefreshSnapshot {
    pub fn panel(&self, id: &str) -> Option<&PanelResult> {
        self.panels.get(id)
    }

    pub fn failed_panels(&self) -> impl Iterator<Item = &PanelResult> {
        self.panels.values().filter(|p| !p.is_ready())
    }
}

#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub snapshot: Arc<RefreshSnapshot>,
    /// False when a newer refresh was already visible
    pub published: bool,
}

pub struct DashboardRefresher {
    orchestrator: Arc<QueryOrchestrator>,
    normalizer: Arc<ResultNormalizer>,
    state: Arc<DashboardState>,
}

impl DashboardRefresher {
    pub fn new(orchestrator: Arc<QueryOrchestrator>, normalizer: ResultNormalizer) -> Self {
        Self::with_state(orchestrator, normalizer, Arc::new(DashboardState::new()))
    }

    pub fn with_state(
        orchestrator: Arc<QueryOrchestrator>,
        normalizer: ResultNormalizer,
        state: Arc<DashboardState>,
    ) -> Self {
        Self {
            orchestrator,
            normalizer: Arc::new(normalizer),
            state,
        }
    }

    pub fn state(&self) -> &Arc<DashboardState> {
        &self.state
    }

    /// Run every panel of `dashboard` under `filters` and publish the
    /// settled results
    pub async fn refresh(
        &self,
        dataset_id: &str,
        dashboard: &DashboardSpec,
        filters: &FilterState,
    ) -> RefreshReport {
        let generation = self.state.begin_refresh();
        let refresh_id = Uuid::new_v4();
        let predicate = build_filter_clause(filters, &dashboard.filters);
        let panels = dashboard.panels();

        info!(
            "Refresh {} (generation {}) for dataset {}: {} panels, filter: {}",
            refresh_id,
            generation,
            dataset_id,
            panels.len(),
            if predicate.is_empty() { "<none>" } else { predicate.as_str() }
        );

        let mut tasks = JoinSet::new();
        for panel in panels.iter().cloned() {
            let orchestrator = Arc::clone(&self.orchestrator);
            let normalizer = Arc::clone(&self.normalizer);
            let dataset_id = dataset_id.to_string();
            let predicate = predicate.clone();
            tasks.spawn(async move {
                run_panel(&orchestrator, &normalizer, &dataset_id, &panel, &predicate).await
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    if results.insert(result.id.clone(), result).is_some() {
                        warn!("Duplicate panel id in dashboard; keeping the last result");
                    }
                }
                Err(e) => warn!("Panel task did not complete: {}", e),
            }
        }

        // Panics lose their id; every panel still gets an entry
        for panel in &panels {
            if !results.contains_key(panel.id()) {
                results.insert(
                    panel.id().to_string(),
                    PanelResult::failed(panel.id(), "Panel task aborted".to_string()),
                );
            }
        }

        let snapshot = Arc::new(RefreshSnapshot {
            refresh_id,
            generation,
            dataset_id: dataset_id.to_string(),
            completed_at: Utc::now(),
            panels: results,
        });

        let published = self.state.publish(Arc::clone(&snapshot)).await;
        if !published {
            warn!("Refresh {} settled after a newer refresh and was discarded", refresh_id);
        }

        RefreshReport {
            snapshot,
            published,
        }
    }
}

async fn run_panel(
    orchestrator: &QueryOrchestrator,
    normalizer: &ResultNormalizer,
    dataset_id: &str,
    panel: &PanelSpec,
    predicate: &str,
) -> PanelResult {
    match orchestrator.run_panel(dataset_id, panel, predicate).await {
        Ok(execution) => {
            let outcome = normalizer.normalize(Some(&execution.response), &RenderSpec::from(panel));
            PanelResult {
                id: panel.id().to_string(),
                sql: Some(execution.sql),
                used_fallback: execution.used_fallback,
                status: PanelStatus::Ready { outcome },
            }
        }
        Err(e) => {
            warn!("Panel {} failed: {}", panel.id(), e);
            PanelResult::failed(panel.id(), e.to_string())
        }
    }
}
