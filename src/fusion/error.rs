use crate::dataset::error::DatasetError;
use crate::ingest::error::IngestError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("No raw records available to process")]
    NoRecords,

    #[error("All {total} stations fell below the coverage threshold of {min_coverage}")]
    NoStationsRetained { total: usize, min_coverage: f64 },

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}
