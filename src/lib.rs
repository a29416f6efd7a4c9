pub mod config;
pub mod dashboard;
pub mod error;
pub mod execution;
pub mod model;
pub mod normalize;
pub mod sql;

pub use config::EngineConfig;
pub use dashboard::{DashboardRefresher, DashboardState, PanelResult, RefreshSnapshot};
pub use error::{EngineError, Result};
pub use execution::{HttpBackend, PolarsBackend, QueryBackend, QueryOrchestrator, TabularResult};
pub use model::{
    ChartSpec, ChartType, DashboardSpec, FilterDeclaration, FilterState, MetricSpec, PanelSpec,
};
pub use normalize::{RenderSpec, ResultNormalizer, ValidationOutcome};
pub use sql::{build_filter_clause, inject_filter, QueryBuilder};
