use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Required artifact '{0}' does not exist; run the previous stage first")]
    Missing(PathBuf),

    #[error("Failed to create or open '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to read CSV '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed to write CSV '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Failed to assemble data frame")]
    Frame(#[from] PolarsError),

    #[error("Required column '{0}' is missing")]
    MissingColumn(String),

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
