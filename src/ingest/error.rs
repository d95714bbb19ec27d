use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Record is not a JSON object")]
    NotAnObject,

    #[error("Record is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Record has unparseable date '{0}'")]
    InvalidDate(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to create directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to list directory '{0}'")]
    DirRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to write batch file '{0}'")]
    BatchWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to read batch file '{0}'")]
    BatchRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode batch file '{0}'")]
    BatchDecode(PathBuf, #[source] serde_json::Error),

    #[error("Failed to encode records for '{0}'")]
    Encode(PathBuf, #[source] serde_json::Error),

    #[error("Failed to write consolidated file '{0}'")]
    ConsolidatedWrite(PathBuf, #[source] std::io::Error),

    #[error("Failed to remove '{0}'")]
    Remove(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
