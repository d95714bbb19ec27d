//! Per-target model training with a chronological train/validation/test split.

use crate::config::{ExperimentConfig, ModelConfig, PipelineConfig};
use crate::dataset::clean::read_clean_dataset;
use crate::features::engineer::FeatureEngineer;
use crate::features::frame::FeatureFrame;
use crate::forecast::error::ForecastError;
use crate::forecast::require_artifact;
use crate::forecast::supervised::{Split, SupervisedSet};
use crate::forecast::target::Target;
use crate::model::metrics::{log_loss, mae, r2, roc_auc};
use crate::model::persistence::TrainedModel;
use crate::model::{Classifier, Model, Predictor, Regressor};
use bon::builder;
use chrono::NaiveDate;
use log::{info, warn};
use std::fmt;

const TOP_FEATURES: usize = 20;

/// Outcome of comparing training fit with held-out performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    Balanced,
    Overfit,
    Underfit,
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Diagnosis::Balanced => "balanced",
            Diagnosis::Overfit => "overfitting",
            Diagnosis::Underfit => "underfitting",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitMetrics {
    Regression {
        train_mae: f64,
        test_mae: f64,
        test_r2: f64,
    },
    Classification {
        train_auc: Option<f64>,
        test_auc: Option<f64>,
        test_log_loss: f64,
    },
}

impl FitMetrics {
    fn diagnose(&self, config: &ModelConfig) -> Diagnosis {
        match self {
            FitMetrics::Regression {
                train_mae,
                test_mae,
                test_r2,
            } => {
                if *test_r2 < config.underfit_r2 {
                    Diagnosis::Underfit
                } else if *train_mae > 0.0 && (test_mae - train_mae) / train_mae > config.overfit_gap_ratio {
                    Diagnosis::Overfit
                } else {
                    Diagnosis::Balanced
                }
            }
            FitMetrics::Classification {
                train_auc, test_auc, ..
            } => match (train_auc, test_auc) {
                (_, Some(test)) if *test < config.underfit_auc => Diagnosis::Underfit,
                (Some(train), Some(test)) if train - test > config.overfit_auc_gap => Diagnosis::Overfit,
                _ => Diagnosis::Balanced,
            },
        }
    }
}

impl fmt::Display for FitMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let auc = |v: &Option<f64>| v.map_or("n/a".to_string(), |v| format!("{v:.3}"));
        match self {
            FitMetrics::Regression {
                train_mae,
                test_mae,
                test_r2,
            } => write!(
                f,
                "train MAE {train_mae:.3}, test MAE {test_mae:.3}, test R² {test_r2:.3}"
            ),
            FitMetrics::Classification {
                train_auc,
                test_auc,
                test_log_loss,
            } => write!(
                f,
                "train AUC {}, test AUC {}, test log-loss {test_log_loss:.3}",
                auc(train_auc),
                auc(test_auc)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub target: Target,
    pub train_rows: usize,
    pub valid_rows: usize,
    pub test_rows: usize,
    pub trees: usize,
    pub metrics: FitMetrics,
    pub diagnosis: Diagnosis,
}

/// A held-out prediction: features of `date` predicting the day after.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPrediction {
    pub station: String,
    pub date: NaiveDate,
    pub actual: f64,
    pub predicted: f64,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub report: TargetReport,
    pub test_predictions: Vec<TestPrediction>,
}

/// Trains one model per [`Target`] from a feature frame.
pub struct ForecastTrainer<'a> {
    model: &'a ModelConfig,
    experiment: &'a ExperimentConfig,
}

impl<'a> ForecastTrainer<'a> {
    pub fn new(model: &'a ModelConfig, experiment: &'a ExperimentConfig) -> Self {
        Self { model, experiment }
    }

    /// Fits `target` on `frame`. Returns `Ok(None)` when the frame lacks the
    /// target's column or has no usable training rows.
    pub fn train(&self, target: Target, frame: &FeatureFrame) -> Result<Option<TrainingOutcome>, ForecastError> {
        let Some(set) = SupervisedSet::build(frame, target, self.experiment, self.model.wet_day_threshold) else {
            warn!(
                "Skipping {}: column '{}' is absent",
                target,
                target.variable().column()
            );
            return Ok(None);
        };
        if set.train.is_empty() {
            warn!("Skipping {}: no complete training rows", target);
            return Ok(None);
        }
        info!(
            "Training {} on {} rows (validation {}, test {})",
            target,
            set.train.len(),
            set.valid.len(),
            set.test.len()
        );

        let params = self.model.params_for(target);
        let valid = if set.valid.is_empty() {
            None
        } else {
            Some((&set.valid.features, set.valid.labels.as_slice()))
        };
        let model = if target.is_classification() {
            Model::Classifier(Classifier::fit(params, &set.train.features, &set.train.labels, valid)?)
        } else {
            Model::Regressor(Regressor::fit(params, &set.train.features, &set.train.labels, valid)?)
        };

        let predict = |m: &Model, split: &Split| -> Vec<f64> {
            m.predict_matrix(&split.features)
                .into_iter()
                .map(|v| target.clamp_prediction(v))
                .collect()
        };
        let train_pred = predict(&model, &set.train);
        let test_pred = predict(&model, &set.test);

        let metrics = if target.is_classification() {
            let as_bool = |labels: &[f64]| labels.iter().map(|l| *l > 0.5).collect::<Vec<bool>>();
            let test_labels = as_bool(&set.test.labels);
            FitMetrics::Classification {
                train_auc: roc_auc(&as_bool(&set.train.labels), &train_pred),
                test_auc: roc_auc(&test_labels, &test_pred),
                test_log_loss: log_loss(&test_labels, &test_pred),
            }
        } else {
            FitMetrics::Regression {
                train_mae: mae(&set.train.labels, &train_pred),
                test_mae: mae(&set.test.labels, &test_pred),
                test_r2: r2(&set.test.labels, &test_pred),
            }
        };
        let diagnosis = metrics.diagnose(self.model);

        let report = TargetReport {
            target,
            train_rows: set.train.len(),
            valid_rows: set.valid.len(),
            test_rows: set.test.len(),
            trees: model.booster().num_trees(),
            metrics,
            diagnosis,
        };
        info!("{}: {} ({} trees)", target, report.metrics, report.trees);
        match diagnosis {
            Diagnosis::Balanced => info!("{}: fit looks {}", target, diagnosis),
            _ => warn!("{}: fit diagnosis is {}", target, diagnosis),
        }

        let test_predictions = set
            .test
            .rows
            .iter()
            .zip(set.test.labels.iter().zip(&test_pred))
            .map(|(row, (actual, predicted))| TestPrediction {
                station: frame.station(*row).to_string(),
                date: frame.date(*row),
                actual: *actual,
                predicted: *predicted,
            })
            .collect();

        let trained = TrainedModel::new(target, frame.names().to_vec(), model);
        for (rank, (name, gain)) in trained.importances().iter().take(TOP_FEATURES).enumerate() {
            info!("  {:>2}. {:<24} {:.1}", rank + 1, name, gain);
        }

        Ok(Some(TrainingOutcome {
            model: trained,
            report,
            test_predictions,
        }))
    }
}

/// Trains every requested target from the clean dataset and writes the
/// models under the models directory. A target that fails is logged and
/// skipped.
///
/// # Errors
///
/// [`ForecastError::MissingArtifact`] if the clean dataset does not exist,
/// [`ForecastError::NothingTrained`] if no target produced a model.
#[builder]
pub async fn train_models(
    config: &PipelineConfig,
    #[builder(default = Target::ALL.to_vec())] targets: Vec<Target>,
) -> Result<Vec<TargetReport>, ForecastError> {
    let path = config.paths.clean_dataset();
    let series = read_clean_dataset(&path)
        .await
        .map_err(|e| require_artifact(e, "process"))?;
    info!("Loaded {} station series from {}", series.len(), path.display());

    let owned = config.clone();
    let outcomes = tokio::task::spawn_blocking(move || {
        let frame = FeatureEngineer::new(&owned.features).build(&series);
        info!("Built {} feature rows with {} features", frame.len(), frame.width());
        let trainer = ForecastTrainer::new(&owned.model, &owned.experiment);
        let mut outcomes = Vec::new();
        for target in targets {
            match trainer.train(target, &frame) {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => warn!("Training {} failed: {}", target, e),
            }
        }
        outcomes
    })
    .await?;

    if outcomes.is_empty() {
        return Err(ForecastError::NothingTrained);
    }
    let mut reports = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        outcome
            .model
            .save(&config.paths.model_file(outcome.report.target))
            .await?;
        reports.push(outcome.report);
    }
    Ok(reports)
}
