use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole run. Per-site network failures never surface here;
/// they are recovered inside the fetcher and reported as outcomes.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read site list {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse site list {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("report error: {0}")]
    Report(#[from] std::io::Error),

    #[error("failed to serialize report line: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
