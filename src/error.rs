use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Execution failure reported by a backend. The message is kept verbatim
    /// because fallback classification matches on it.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("{}", describe_failure(.primary, .fallback.as_deref()))]
    QueryFailed {
        primary: String,
        fallback: Option<String>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

fn describe_failure(primary: &str, fallback: Option<&str>) -> String {
    match fallback {
        Some(fallback) => format!(
            "Query failed: {}; fallback query also failed: {}",
            primary, fallback
        ),
        None => format!("Query failed: {}", primary),
    }
}

impl EngineError {
    /// Message used for failure classification. Backend errors expose the raw
    /// backend text so substrings like "Binder Error" survive intact.
    pub fn message(&self) -> String {
        match self {
            EngineError::Backend(msg) | EngineError::Http(msg) | EngineError::Polars(msg) => {
                msg.clone()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
