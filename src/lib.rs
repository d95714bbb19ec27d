mod config;
mod dataset;
mod error;
mod features;
mod forecast;
mod fusion;
mod heuristics;
mod ingest;
mod model;
mod pipeline;
mod sources;
mod types;
mod utils;

pub use config::*;
pub use error::{ConfigError, PipelineError};
pub use pipeline::RainbowForecast;

pub use dataset::error::DatasetError;
pub use dataset::forecast_table::ForecastTable;
pub use features::engineer::FeatureEngineer;
pub use features::frame::FeatureFrame;
pub use types::record::{Observations, PhysicsDay, WeatherRecord};
pub use types::series::CanonicalSeries;
pub use types::station::*;
pub use types::variable::Variable;

pub use ingest::error::IngestError;
pub use ingest::runner::IngestionSummary;
pub use ingest::validator::{parse_locale_number, parse_precipitation, validate_batch, validate_record};
pub use sources::error::SourceError;
pub use sources::{ObservationSource, PhysicsSource};

pub use fusion::audit::ImputationAudit;
pub use fusion::error::FusionError;
pub use fusion::impute::{impute_column, FillCounts};
pub use fusion::processor::FusionOutput;

pub use model::error::ModelError;
pub use model::gbdt::{Booster, BoosterParams, Matrix, Objective};
pub use model::persistence::TrainedModel;
pub use model::{Classifier, Model, Predictor, Regressor};

pub use forecast::error::ForecastError;
pub use forecast::recursive::{DegradationCurve, RecursiveSimulator, Simulation};
pub use forecast::report::{ClassificationScores, ComparativeReport, RainComparison, RegressionComparison};
pub use forecast::target::Target;
pub use forecast::trainer::{Diagnosis, FitMetrics, TargetReport};

pub use heuristics::apparent_temperature::apparent_temperature;
pub use heuristics::rainbow::rainbow_probability;
