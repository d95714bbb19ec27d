//! Fusion of the raw primary records with the secondary physics series into
//! the canonical clean dataset.

pub mod audit;
pub mod error;
pub mod impute;
pub mod processor;

use crate::config::PipelineConfig;
use crate::dataset::clean::write_clean_dataset;
use crate::fusion::error::FusionError;
use crate::fusion::processor::{FusionOutput, WeatherProcessor};
use crate::ingest::store::IngestionStore;
use crate::ingest::validator::validate_batch;
use crate::sources::PhysicsSource;
use log::info;

/// Loads every consolidated raw file, fuses it and writes the clean dataset.
pub async fn build_clean_dataset<P: PhysicsSource>(
    config: &PipelineConfig,
    physics: P,
) -> Result<FusionOutput, FusionError> {
    let store = IngestionStore::new(&config.paths.raw_dir());
    let raw = store.load_records().await?;
    let records = validate_batch(&raw);
    info!("{} of {} raw records passed validation", records.len(), raw.len());

    let processor = WeatherProcessor::new(config, physics);
    let output = processor.process(records).await?;
    write_clean_dataset(&output.series, &config.paths.clean_dataset()).await?;
    Ok(output)
}
