//! HTTP Backend - forwards SQL to a remote analytics service
//!
//! Uses `POST {base_url}/api/v1/analytics/{dataset_id}/query` with body
//! `{"sql": "..."}`. Error responses carry the engine message in `detail`.

use crate::error::{EngineError, Result};
use crate::execution::backend::QueryBackend;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn query_url(&self, dataset_id: &str) -> String {
        format!("{}/api/v1/analytics/{}/query", self.base_url, dataset_id)
    }
}

/// Pull the failure text out of an error body, preferring `detail`
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => match json.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

#[async_trait]
impl QueryBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn execute(&self, dataset_id: &str, sql: &str) -> Result<Value> {
        let url = self.query_url(dataset_id);
        info!("Posting query for dataset {} to {}", dataset_id, url);

        let body = serde_json::json!({ "sql": sql });
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Http(format!("Analytics API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let detail = error_detail(&text);
            warn!("Analytics API returned {}: {}", status, detail);
            return Err(EngineError::Backend(detail));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EngineError::Http(format!("Failed to parse analytics response: {}", e)))
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(&format!("{}/health", self.base_url))
            .send()
            .await
            .map_err(|e| EngineError::Http(format!("Health check failed: {}", e)))?;
        Ok(response.status().is_success())
    }
}
