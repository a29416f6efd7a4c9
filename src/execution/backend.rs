//! Query Backend Trait - the SQL execution contract
//!
//! A backend runs one SQL statement against one dataset and hands back the
//! raw JSON response. The response shape is deliberately unconstrained; the
//! normalizer knows how to find rows in every shape backends produce.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Backend name (e.g., "polars", "http")
    fn name(&self) -> &'static str;

    /// Execute `sql` against the dataset identified by `dataset_id`.
    ///
    /// Failures should carry the engine's own message in
    /// [`EngineError::Backend`](crate::error::EngineError::Backend) so that
    /// structural failures can be recognized.
    async fn execute(&self, dataset_id: &str, sql: &str) -> Result<Value>;

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;
}
