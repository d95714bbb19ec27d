use crate::dataset::error::DatasetError;
use crate::model::error::ModelError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Required artifact '{0}' not found, run the '{1}' stage first")]
    MissingArtifact(PathBuf, &'static str),

    #[error("No trained models found in '{0}'")]
    NoModels(PathBuf),

    #[error("No target could be trained")]
    NothingTrained,

    #[error("Dataset has no rows for year {0}")]
    NoDataForYear(i32),

    #[error("No history before {0} to start from")]
    NoHistory(chrono::NaiveDate),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
