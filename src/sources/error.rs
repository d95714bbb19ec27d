use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Rate limit reached for {0}")]
    RateLimited(String),

    #[error("No data available for {0}")]
    NoData(String),

    #[error("Unexpected response from {url}: {message}")]
    UnexpectedPayload { url: String, message: String },

    #[error("Failed to parse JSON from {0}")]
    JsonParse(String, #[source] serde_json::Error),

    #[error("No API key configured for the observation source (set AEMET_API_KEY)")]
    MissingApiKey,

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing parquet cache file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to read parquet cache file '{0}'")]
    ParquetRead(PathBuf, #[source] PolarsError),

    #[error("Cached frame '{path}' is malformed: {message}")]
    CacheCorrupt { path: PathBuf, message: String },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl SourceError {
    pub fn is_rate_limit(&self) -> bool {
        match self {
            SourceError::RateLimited(_) => true,
            SourceError::HttpStatus { status, .. } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
