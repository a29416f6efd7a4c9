//! Polars Backend - runs SQL over a CSV dataset on local disk
//!
//! Each dataset lives at `<data_dir>/<dataset_id>.csv` and is registered in a
//! fresh SQL context under the name `dataset` for every query.

use crate::error::{EngineError, Result};
use crate::execution::backend::QueryBackend;
use crate::execution::result::{Row, TabularResult};
use crate::sql::BASE_TABLE;
use async_trait::async_trait;
use polars::prelude::*;
use polars::sql::SQLContext;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct PolarsBackend {
    data_dir: PathBuf,
}

impl PolarsBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn dataset_path(&self, dataset_id: &str) -> Result<PathBuf> {
        if dataset_id.is_empty()
            || dataset_id.contains('/')
            || dataset_id.contains('\\')
            || dataset_id.contains("..")
        {
            return Err(EngineError::Backend(format!(
                "Invalid dataset id: {}",
                dataset_id
            )));
        }

        let path = self.data_dir.join(format!("{}.csv", dataset_id));
        if !path.exists() {
            return Err(EngineError::Backend(format!(
                "Dataset not found: {}",
                dataset_id
            )));
        }
        Ok(path)
    }
}

/// Load the CSV, expose it as `dataset` and run the statement to completion
fn run_sql(path: &Path, sql: &str) -> Result<TabularResult> {
    let frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .finish()
        .map_err(|e| EngineError::Polars(format!("Failed to load CSV: {}", e)))?;

    let mut ctx = SQLContext::new();
    ctx.register(BASE_TABLE, frame);

    let df = ctx
        .execute(sql)
        .and_then(|lf| lf.collect())
        .map_err(backend_error)?;

    dataframe_to_result(&df)
}

/// Unresolved columns are reported in the binder vocabulary the failure
/// classifier recognizes, and unparseable statements as syntax errors.
/// Every other message passes through untouched.
fn backend_error(e: PolarsError) -> EngineError {
    let message = e.to_string();
    match e {
        PolarsError::ColumnNotFound(_) | PolarsError::SchemaFieldNotFound(_) => {
            EngineError::Backend(format!("Binder Error: {}", message))
        }
        _ if message.to_lowercase().contains("sql parser error") => {
            EngineError::Backend(format!("syntax error: {}", message))
        }
        _ => EngineError::Backend(message),
    }
}

pub(crate) fn dataframe_to_result(df: &DataFrame) -> Result<TabularResult> {
    let columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let mut row = Row::new();
        for col_name in &columns {
            let series = df
                .column(col_name)
                .map_err(|e| EngineError::Polars(e.to_string()))?;
            row.insert(col_name.clone(), series_to_json_value(series, row_idx)?);
        }
        rows.push(row);
    }

    Ok(TabularResult::new(columns, rows))
}

fn series_to_json_value(series: &Series, row_idx: usize) -> Result<Value> {
    let any_val = series
        .get(row_idx)
        .map_err(|e| EngineError::Polars(format!("Failed to get value: {}", e)))?;

    let value = match any_val {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::Int8(i) => Value::Number(i.into()),
        AnyValue::Int16(i) => Value::Number(i.into()),
        AnyValue::Int32(i) => Value::Number(i.into()),
        AnyValue::Int64(i) => Value::Number(i.into()),
        AnyValue::UInt8(u) => Value::Number(u.into()),
        AnyValue::UInt16(u) => Value::Number(u.into()),
        AnyValue::UInt32(u) => Value::Number(u.into()),
        AnyValue::UInt64(u) => Value::Number(u.into()),
        AnyValue::Float32(f) => serde_json::Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnyValue::Float64(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        // Dates, datetimes and anything else render through Display
        other => Value::String(other.to_string()),
    };
    Ok(value)
}

#[async_trait]
impl QueryBackend for PolarsBackend {
    fn name(&self) -> &'static str {
        "polars"
    }

    async fn execute(&self, dataset_id: &str, sql: &str) -> Result<Value> {
        let path = self.dataset_path(dataset_id)?;
        info!("Executing query on dataset {} with Polars: {}", dataset_id, sql);

        let statement = sql.to_string();
        let result = tokio::task::spawn_blocking(move || run_sql(&path, &statement))
            .await
            .map_err(|e| EngineError::Backend(format!("Query task failed: {}", e)))??;

        debug!("Polars returned {} rows", result.row_count);
        Ok(result.to_response(sql))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.data_dir.is_dir())
    }
}
