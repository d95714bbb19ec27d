//! Entry point tying the stages together. Each stage reads the artifact of the
//! previous one from disk, so stages can be run one at a time or in sequence.

use crate::config::PipelineConfig;
use crate::dataset::forecast_table::ForecastTable;
use crate::error::PipelineError;
use crate::forecast::one_step::run_one_step;
use crate::forecast::recursive::{run_recursive, Simulation};
use crate::forecast::report::{run_report, ComparativeReport};
use crate::forecast::target::Target;
use crate::forecast::trainer::{train_models, TargetReport};
use crate::fusion::build_clean_dataset;
use crate::fusion::processor::FusionOutput;
use crate::heuristics::write_final_forecast;
use crate::ingest::runner::{IngestionRunner, IngestionSummary};
use crate::ingest::store::IngestionStore;
use crate::sources::aemet::AemetClient;
use crate::sources::open_meteo::OpenMeteoClient;
use crate::sources::physics_cache::CachedPhysicsSource;
use crate::utils::ensure_dir_exists;
use bon::bon;
use chrono::NaiveDate;
use log::info;

/// Runs the forecasting pipeline for one configuration.
///
/// # Examples
///
/// ```rust
/// # use rainbow_forecast::{PipelineConfig, PipelineError, RainbowForecast};
/// # async fn run() -> Result<(), PipelineError> {
/// let pipeline = RainbowForecast::new(PipelineConfig::load(None)?).await?;
/// pipeline.train().call().await?;
/// pipeline.forecast().await?;
/// # Ok(())
/// # }
/// ```
pub struct RainbowForecast {
    config: PipelineConfig,
}

#[bon]
impl RainbowForecast {
    /// Creates the data directories the stages write into.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DirCreation`] if a directory cannot be created.
    pub async fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let paths = &config.paths;
        for dir in [
            paths.raw_dir(),
            paths.processed_dir(),
            paths.predictions_dir(),
            paths.models_dir(),
        ] {
            ensure_dir_exists(&dir)
                .await
                .map_err(|e| PipelineError::DirCreation(dir.clone(), e))?;
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Downloads raw observations for every configured station into the
    /// ingestion store.
    pub async fn ingest(&self) -> Result<IngestionSummary, PipelineError> {
        let source = AemetClient::new(&self.config.ingestion)?;
        let store = IngestionStore::new(&self.config.paths.raw_dir());
        let runner = IngestionRunner::new(source, &store, &self.config.ingestion);
        Ok(runner.run(&self.config.registry(), &self.config.calendar).await?)
    }

    /// Fuses raw observations with the physics source into the clean dataset.
    pub async fn process(&self) -> Result<FusionOutput, PipelineError> {
        let cache_dir = self.config.paths.cache_dir();
        ensure_dir_exists(&cache_dir)
            .await
            .map_err(|e| PipelineError::DirCreation(cache_dir.clone(), e))?;
        let physics = CachedPhysicsSource::new(OpenMeteoClient::new(&self.config.ingestion)?, &cache_dir);
        Ok(build_clean_dataset(&self.config, physics).await?)
    }

    #[builder]
    pub async fn train(
        &self,
        #[builder(default = Target::ALL.to_vec())] targets: Vec<Target>,
    ) -> Result<Vec<TargetReport>, PipelineError> {
        Ok(train_models()
            .config(&self.config)
            .targets(targets)
            .call()
            .await?)
    }

    /// One-step forecast of the target year, enriched with the heuristic scores.
    pub async fn forecast(&self) -> Result<ForecastTable, PipelineError> {
        let table = run_one_step(&self.config).await?;
        Ok(write_final_forecast(&self.config.paths, &table).await?)
    }

    #[builder]
    pub async fn simulate(
        &self,
        cutoff: Option<NaiveDate>,
        horizon_days: Option<usize>,
    ) -> Result<Simulation, PipelineError> {
        Ok(run_recursive(&self.config, cutoff, horizon_days).await?)
    }

    pub async fn report(&self) -> Result<ComparativeReport, PipelineError> {
        Ok(run_report(&self.config).await?)
    }

    /// Every stage in order. A stage that fails aborts the run.
    pub async fn run_all(&self) -> Result<ComparativeReport, PipelineError> {
        let ingested = self.ingest().await?;
        info!("Ingested {} records", ingested.records_saved);
        self.process().await?;
        self.train().call().await?;
        self.forecast().await?;
        self.simulate().call().await?;
        self.report().await
    }
}
