//! Query execution - backends, failure classification and fallback policy

pub mod backend;
pub mod classifier;
pub mod http_backend;
pub mod orchestrator;
pub mod polars_backend;
pub mod result;

pub use backend::QueryBackend;
pub use classifier::{ErrorClassifier, FailureClass};
pub use http_backend::HttpBackend;
pub use orchestrator::{ExecutionOutcome, PlannedQuery, QueryOrchestrator, QueryOrigin};
pub use polars_backend::PolarsBackend;
pub use result::{Row, TabularResult};
