use autocurate_query::dashboard::DashboardRefresher;
use autocurate_query::execution::{HttpBackend, PolarsBackend, QueryBackend, QueryOrchestrator};
use autocurate_query::model::{DashboardSpec, FilterState};
use autocurate_query::normalize::ResultNormalizer;
use autocurate_query::sql::{build_filter_clause, inject_filter};
use autocurate_query::EngineConfig;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "autocurate-query")]
#[command(about = "Dashboard query construction and resilient execution")]
#[command(version)]
struct Args {
    /// Override AUTOCURATE_DATA_DIR
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL each KPI and chart of a dashboard would run
    Build {
        /// Dashboard configuration JSON
        dashboard: PathBuf,

        /// Filter state JSON (filter id -> value)
        #[arg(short, long)]
        filters: Option<PathBuf>,
    },
    /// Inject a filter state into arbitrary SQL
    Rewrite {
        #[arg(long)]
        sql: String,

        /// Filter state JSON (filter id -> value)
        #[arg(short, long)]
        filters: PathBuf,

        /// Dashboard configuration JSON holding the filter declarations
        #[arg(short, long)]
        catalog: PathBuf,
    },
    /// Refresh a dashboard against the configured backend
    Run {
        /// Dashboard configuration JSON
        dashboard: PathBuf,

        /// Dataset id (defaults to the dashboard's dataset_id)
        #[arg(long)]
        dataset: Option<String>,

        /// Filter state JSON (filter id -> value)
        #[arg(short, long)]
        filters: Option<PathBuf>,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_filters(path: Option<&Path>) -> Result<FilterState> {
    match path {
        Some(path) => read_json(path),
        None => Ok(FilterState::new()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let mut config = EngineConfig::from_env()?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.command {
        Commands::Build { dashboard, filters } => {
            let dashboard: DashboardSpec = read_json(&dashboard)?;
            let filters = read_filters(filters.as_deref())?;
            let predicate = build_filter_clause(&filters, &dashboard.filters);

            let backend: Arc<dyn QueryBackend> = Arc::new(PolarsBackend::new(&config.data_dir));
            let orchestrator = QueryOrchestrator::new(backend, &config);
            for panel in dashboard.panels() {
                let planned = orchestrator.plan(&panel, &predicate);
                println!("-- {} ({:?})", panel.id(), planned.origin);
                println!("{};", planned.sql);
            }
        }
        Commands::Rewrite { sql, filters, catalog } => {
            let catalog: DashboardSpec = read_json(&catalog)?;
            let filters: FilterState = read_json(&filters)?;
            let predicate = build_filter_clause(&filters, &catalog.filters);
            println!("{}", inject_filter(&sql, &predicate));
        }
        Commands::Run {
            dashboard,
            dataset,
            filters,
        } => {
            let dashboard: DashboardSpec = read_json(&dashboard)?;
            let filters = read_filters(filters.as_deref())?;
            let dataset_id = dataset
                .or_else(|| dashboard.dataset_id.clone())
                .context("No dataset id given and the dashboard has none")?;

            let backend: Arc<dyn QueryBackend> = match &config.api_url {
                Some(url) => Arc::new(HttpBackend::new(url.as_str())),
                None => Arc::new(PolarsBackend::new(&config.data_dir)),
            };
            match backend.health_check().await {
                Ok(true) => info!("Using {} backend", backend.name()),
                Ok(false) => warn!("{} backend reports unhealthy", backend.name()),
                Err(e) => warn!("{} backend health check failed: {}", backend.name(), e),
            }

            let orchestrator = Arc::new(QueryOrchestrator::new(backend, &config));
            let refresher =
                DashboardRefresher::new(orchestrator, ResultNormalizer::from_config(&config));
            let report = refresher.refresh(&dataset_id, &dashboard, &filters).await;

            for failed in report.snapshot.failed_panels() {
                warn!("Panel {} failed: {}", failed.id, failed.error().unwrap_or_default());
            }
            println!("{}", serde_json::to_string_pretty(report.snapshot.as_ref())?);
        }
    }

    Ok(())
}
