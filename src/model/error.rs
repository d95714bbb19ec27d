use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Expected {expected} labels, got {found}")]
    LabelCount { expected: usize, found: usize },

    #[error("Row has {found} features, model expects {expected}")]
    FeatureCount { expected: usize, found: usize },

    #[error("Binary objective requires labels in {{0, 1}}, found {0}")]
    InvalidLabel(f64),

    #[error("Failed to write model file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to read model file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode model for '{0}'")]
    Encode(PathBuf, #[source] Box<bincode::error::EncodeError>),

    #[error("Failed to decode model file '{0}'")]
    Decode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
