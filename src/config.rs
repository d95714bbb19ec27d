//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once at process start, either from defaults or
//! from a TOML file, and passed by reference to every stage. Every section is
//! optional in the file:
//!
//! ```toml
//! [paths]
//! root = "data"
//!
//! [fusion]
//! min_coverage = 0.9
//!
//! [model]
//! rain_threshold = 0.25
//! ```

use crate::error::ConfigError;
use crate::forecast::target::Target;
use crate::model::gbdt::{BoosterParams, Objective};
use crate::types::station::{default_stations, Station, StationRegistry};
use crate::types::variable::Variable;
use crate::utils::default_cache_dir;
use bon::Builder;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const API_KEY_ENV: &str = "AEMET_API_KEY";

pub(crate) fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Root configuration for every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    #[builder(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    #[builder(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    #[builder(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    #[builder(default)]
    pub fusion: FusionConfig,

    #[serde(default)]
    #[builder(default)]
    pub features: FeatureConfig,

    #[serde(default)]
    #[builder(default)]
    pub experiment: ExperimentConfig,

    #[serde(default)]
    #[builder(default)]
    pub model: ModelConfig,

    /// Observation points to ingest and model.
    #[serde(default = "default_stations")]
    #[builder(default = default_stations())]
    pub stations: Vec<Station>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PipelineConfig {
    /// Loads configuration from an optional TOML file and the environment.
    ///
    /// Without a path the defaults are used. The upstream API key is always
    /// taken from `AEMET_API_KEY` when that variable is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`] if the file
    /// cannot be loaded, and [`ConfigError::Invalid`] if the resulting values
    /// are inconsistent (e.g. validation starting after test).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
                toml::from_str::<PipelineConfig>(&text)
                    .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?
            }
            None => PipelineConfig::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.ingestion.aemet_api_key = Some(key.trim().to_string());
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.calendar.global_start > self.calendar.global_end {
            return invalid("calendar.global_start is after calendar.global_end");
        }
        if self.experiment.val_start >= self.experiment.test_start {
            return invalid("experiment.val_start must precede experiment.test_start");
        }
        if !(0.0..=1.0).contains(&self.fusion.min_coverage) {
            return invalid("fusion.min_coverage must be within [0, 1]");
        }
        if self.features.lags.iter().any(|lag| *lag == 0) {
            return invalid("features.lags must be positive");
        }
        if self.features.windows.iter().any(|w| *w == 0) {
            return invalid("features.windows must be positive");
        }
        if !(0.0..=1.0).contains(&self.model.rain_threshold) {
            return invalid("model.rain_threshold must be a probability");
        }
        if self.ingestion.window_months == 0 {
            return invalid("ingestion.window_months must be positive");
        }
        Ok(())
    }

    pub fn registry(&self) -> StationRegistry {
        StationRegistry::new(self.stations.clone())
    }
}

/// Filesystem layout of the pipeline's artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of raw, processed and prediction data.
    #[builder(into, default = PathBuf::from("data"))]
    pub root: PathBuf,
    /// Where trained models are written. Defaults to `<root>/models`.
    #[builder(into)]
    pub models: Option<PathBuf>,
    /// Where physics-source responses are cached. Defaults to the user cache dir.
    #[builder(into)]
    pub cache: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PathsConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn predictions_dir(&self) -> PathBuf {
        self.root.join("predictions")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.models
            .clone()
            .unwrap_or_else(|| self.root.join("models"))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache
            .clone()
            .or_else(default_cache_dir)
            .unwrap_or_else(|| self.root.join("cache"))
    }

    pub fn clean_dataset(&self) -> PathBuf {
        self.processed_dir().join("weather_dataset_clean.csv")
    }

    pub fn one_step_forecast(&self, year: i32) -> PathBuf {
        self.predictions_dir()
            .join(format!("one_step_forecast_{year}.csv"))
    }

    pub fn recursive_forecast(&self, year: i32) -> PathBuf {
        self.predictions_dir()
            .join(format!("recursive_forecast_{year}.csv"))
    }

    pub fn final_forecast(&self) -> PathBuf {
        self.predictions_dir().join("rainbow_forecast_final.csv")
    }

    pub fn model_file(&self, target: Target) -> PathBuf {
        self.models_dir().join(format!("gbdt_{}.bin", target.name()))
    }
}

/// The canonical calendar every station series is reindexed onto.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct CalendarConfig {
    #[builder(default = ymd(2009, 1, 1))]
    pub global_start: NaiveDate,
    #[builder(default = ymd(2025, 12, 31))]
    pub global_end: NaiveDate,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CalendarConfig {
    /// Number of days in the inclusive calendar.
    pub fn total_days(&self) -> usize {
        ((self.global_end - self.global_start).num_days() + 1).max(0) as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct RetryConfig {
    #[builder(default = 5)]
    pub max_attempts: u32,
    /// First backoff delay, doubled on each further failure.
    #[builder(default = 2_000)]
    pub base_delay_ms: u64,
    /// Fixed wait after the upstream signals a rate limit.
    #[builder(default = 70)]
    pub rate_limit_cooldown_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct IngestionConfig {
    #[builder(default = 6)]
    pub window_months: u32,
    /// Courtesy pause between consecutive upstream calls.
    #[builder(default = 500)]
    pub request_delay_ms: u64,
    #[builder(default = 30)]
    pub timeout_secs: u64,
    #[builder(default)]
    pub retry: RetryConfig,
    #[builder(into, default = String::from("https://opendata.aemet.es/opendata/api/valores/climatologicos/diarios/datos"))]
    pub aemet_url: String,
    #[builder(into, default = String::from("https://archive-api.open-meteo.com/v1/archive"))]
    pub open_meteo_url: String,
    pub aemet_api_key: Option<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Quality gate and imputation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct FusionConfig {
    /// Minimum share of calendar days a station must report to be kept.
    #[builder(default = 0.85)]
    pub min_coverage: f64,
    /// Longest run of missing days bridged by linear interpolation.
    #[builder(default = 7)]
    pub max_interpolation_gap: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Lag, rolling and trend feature parameters, shared by training and inference.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default, deny_unknown_fields)]
pub struct FeatureConfig {
    #[builder(default = vec![
        Variable::Tavg, Variable::Tmin, Variable::Tmax, Variable::Rhum, Variable::Pres,
        Variable::Cldc, Variable::Wspd, Variable::Tsun, Variable::Prcp,
    ])]
    pub lag_columns: Vec<Variable>,
    #[builder(default = vec![1, 2, 7])]
    pub lags: Vec<usize>,
    #[builder(default = vec![Variable::Tavg, Variable::Rhum, Variable::Pres, Variable::Cldc])]
    pub rolling_columns: Vec<Variable>,
    #[builder(default = vec![3, 7, 14])]
    pub windows: Vec<usize>,
    #[builder(default = vec![Variable::Tavg, Variable::Tmin, Variable::Tmax])]
    pub trend_columns: Vec<Variable>,
    /// Wind direction code meaning calm or variable.
    #[builder(default = 99.0)]
    pub calm_wind_sentinel: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Chronological split and forecasting horizon.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct ExperimentConfig {
    #[builder(default = ymd(2024, 1, 1))]
    pub val_start: NaiveDate,
    #[builder(default = ymd(2025, 1, 1))]
    pub test_start: NaiveDate,
    #[builder(default = 2025)]
    pub target_year: i32,
    #[builder(default = 365)]
    pub horizon_days: usize,
    /// Trailing rows used to recompute features during simulation. Raised
    /// automatically to the longest lag or window in use.
    #[builder(default = 40)]
    pub lookback_days: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ExperimentConfig {
    /// First simulated day.
    pub fn cutoff(&self) -> NaiveDate {
        ymd(self.target_year, 1, 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct ModelConfig {
    #[builder(default = BoosterParams::builder()
        .objective(Objective::L1)
        .num_leaves(31)
        .learning_rate(0.05)
        .feature_fraction(0.9)
        .num_boost_round(1000)
        .early_stopping_rounds(50)
        .build())]
    pub regression: BoosterParams,
    #[builder(default = BoosterParams::builder()
        .objective(Objective::Binary)
        .num_leaves(40)
        .learning_rate(0.04)
        .feature_fraction(0.8)
        .num_boost_round(1500)
        .early_stopping_rounds(100)
        .build())]
    pub classifier: BoosterParams,
    /// Probability above which a day is reported as rainy.
    #[builder(default = 0.3)]
    pub rain_threshold: f64,
    /// Precipitation (mm) above which a day counts as wet.
    #[builder(default = 0.1)]
    pub wet_day_threshold: f64,
    /// Precipitation written into simulated wet days.
    #[builder(default = 10.0)]
    pub synthetic_wet_precip: f64,
    /// Relative train/test MAE gap that flags overfitting.
    #[builder(default = 0.25)]
    pub overfit_gap_ratio: f64,
    /// Held-out R² below which a regression is flagged as underfit.
    #[builder(default = 0.3)]
    pub underfit_r2: f64,
    #[builder(default = 0.1)]
    pub overfit_auc_gap: f64,
    #[builder(default = 0.65)]
    pub underfit_auc: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ModelConfig {
    pub fn params_for(&self, target: Target) -> &BoosterParams {
        if target.is_classification() {
            &self.classifier
        } else {
            &self.regression
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_reference_experiment() {
        let config = PipelineConfig::default();
        assert_eq!(config.calendar.global_start, ymd(2009, 1, 1));
        assert_eq!(config.calendar.total_days(), 6209);
        assert_eq!(config.experiment.cutoff(), ymd(2025, 1, 1));
        assert_eq!(config.fusion.max_interpolation_gap, 7);
        assert_eq!(config.model.classifier.num_leaves, 40);
        assert_eq!(config.model.regression.objective, Objective::L1);
        assert_eq!(config.stations.len(), 26);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_partial_toml() -> Result<(), ConfigError> {
        let mut file = tempfile::NamedTempFile::new().map_err(|e| ConfigError::Read("tmp".into(), e))?;
        writeln!(
            file,
            r#"
[paths]
root = "/tmp/rf"

[fusion]
min_coverage = 0.9

[model]
rain_threshold = 0.25

[[stations]]
code = "0076"
name = "Barcelona - Aeropuerto"
latitude = 41.293
longitude = 2.070
"#
        )
        .map_err(|e| ConfigError::Read("tmp".into(), e))?;

        let config = PipelineConfig::load(Some(file.path()))?;
        assert_eq!(config.paths.root, PathBuf::from("/tmp/rf"));
        assert_eq!(config.paths.clean_dataset(), PathBuf::from("/tmp/rf/processed/weather_dataset_clean.csv"));
        assert_eq!(config.fusion.min_coverage, 0.9);
        assert_eq!(config.fusion.max_interpolation_gap, 7);
        assert_eq!(config.model.rain_threshold, 0.25);
        assert_eq!(config.model.wet_day_threshold, 0.1);
        assert_eq!(config.stations.len(), 1);
        Ok(())
    }

    #[test]
    fn calm_wind_sentinel_belongs_to_features() -> Result<(), ConfigError> {
        let write = |body: &str| -> Result<tempfile::NamedTempFile, ConfigError> {
            let mut file = tempfile::NamedTempFile::new().map_err(|e| ConfigError::Read("tmp".into(), e))?;
            write!(file, "{body}").map_err(|e| ConfigError::Read("tmp".into(), e))?;
            Ok(file)
        };

        let file = write("[features]\ncalm_wind_sentinel = 90.0\n")?;
        let config = PipelineConfig::load(Some(file.path()))?;
        assert_eq!(config.features.calm_wind_sentinel, 90.0);
        assert_eq!(PipelineConfig::default().features.calm_wind_sentinel, 99.0);

        let misplaced = write("[fusion]\ncalm_wind_sentinel = 90.0\n")?;
        assert!(matches!(
            PipelineConfig::load(Some(misplaced.path())),
            Err(ConfigError::Parse(_, _))
        ));
        Ok(())
    }

    #[test]
    fn rejects_inverted_split() {
        let config = PipelineConfig::builder()
            .experiment(
                ExperimentConfig::builder()
                    .val_start(ymd(2025, 6, 1))
                    .test_start(ymd(2025, 1, 1))
                    .build(),
            )
            .build();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
