//! Engine configuration
//!
//! Settings are read from the environment (optionally seeded from a `.env`
//! file by the binary). Every field has a default so an empty environment
//! yields a working local setup.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Directory holding uploaded `<dataset_id>.csv` files
    pub data_dir: PathBuf,

    /// Base URL of a remote analytics API; when set the HTTP backend is used
    pub api_url: Option<String>,

    pub log_level: String,

    /// Retry raw upstream SQL with a synthesized query on structural failures
    pub fallback_enabled: bool,

    /// Advisory threshold: pie charts above this many categories are crowded
    pub pie_max_categories: usize,

    /// Advisory threshold: line charts above this many points are crowded
    pub line_max_points: usize,

    /// Row limit for `SELECT *` previews and axis-less charts
    pub preview_limit: usize,

    /// Row limit for synthesized chart fallbacks
    pub fallback_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/uploads"),
            api_url: None,
            log_level: "info".to_string(),
            fallback_enabled: true,
            pie_max_categories: 20,
            line_max_points: 100,
            preview_limit: 100,
            fallback_limit: 10,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `AUTOCURATE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("AUTOCURATE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let api_url = lookup("AUTOCURATE_API_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        let log_level = lookup("AUTOCURATE_LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            data_dir,
            api_url,
            log_level,
            fallback_enabled: parse_var(
                &lookup,
                "AUTOCURATE_FALLBACK_ENABLED",
                defaults.fallback_enabled,
            )?,
            pie_max_categories: parse_var(
                &lookup,
                "AUTOCURATE_PIE_MAX_CATEGORIES",
                defaults.pie_max_categories,
            )?,
            line_max_points: parse_var(
                &lookup,
                "AUTOCURATE_LINE_MAX_POINTS",
                defaults.line_max_points,
            )?,
            preview_limit: parse_var(&lookup, "AUTOCURATE_PREVIEW_LIMIT", defaults.preview_limit)?,
            fallback_limit: parse_var(
                &lookup,
                "AUTOCURATE_FALLBACK_LIMIT",
                defaults.fallback_limit,
            )?,
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| {
            EngineError::Config(format!("Invalid value '{}' for {}: {}", raw, key, e))
        }),
    }
}
