//! Forecasting stages: per-target training, the one-step forecaster, the
//! recursive simulator and the comparative report joining their outputs.

pub mod error;
pub mod one_step;
pub mod recursive;
pub mod report;
pub mod supervised;
pub mod target;
pub mod trainer;

#[cfg(test)]
pub(crate) mod fixtures;

use crate::config::PathsConfig;
use crate::dataset::error::DatasetError;
use crate::forecast::error::ForecastError;
use crate::forecast::target::Target;
use crate::model::persistence::TrainedModel;
use crate::types::variable::Variable;
use log::{debug, info};

/// Observed variables copied into forecast tables as `real_{column}`.
pub const REAL_VARIABLES: [Variable; 7] = [
    Variable::Tavg,
    Variable::Tmin,
    Variable::Tmax,
    Variable::Prcp,
    Variable::Tsun,
    Variable::Rhum,
    Variable::Wspd,
];

pub const RAIN_CLASS_COLUMN: &str = "pred_is_raining";

pub fn real_column(variable: Variable) -> String {
    format!("real_{}", variable.column())
}

/// Maps an absent input file to [`ForecastError::MissingArtifact`] naming the
/// stage that produces it.
pub(crate) fn require_artifact(err: DatasetError, stage: &'static str) -> ForecastError {
    match err {
        DatasetError::Missing(path) => ForecastError::MissingArtifact(path, stage),
        other => other.into(),
    }
}

/// Loads every persisted target model, skipping targets never trained.
///
/// # Errors
///
/// [`ForecastError::NoModels`] if no model file exists, or the error of a
/// model file that exists but cannot be decoded.
pub async fn load_models(paths: &PathsConfig) -> Result<Vec<TrainedModel>, ForecastError> {
    let mut models = Vec::new();
    for target in Target::ALL {
        let path = paths.model_file(target);
        if !path.exists() {
            debug!("No model for {} at {}", target, path.display());
            continue;
        }
        models.push(TrainedModel::load(&path).await?);
    }
    if models.is_empty() {
        return Err(ForecastError::NoModels(paths.models_dir()));
    }
    info!(
        "Loaded models: {}",
        models
            .iter()
            .map(|m| m.target().name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(models)
}
