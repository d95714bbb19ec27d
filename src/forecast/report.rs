use crate::config::{ModelConfig, PipelineConfig};
use crate::dataset::forecast_table::ForecastTable;
use crate::forecast::error::ForecastError;
use crate::forecast::target::Target;
use crate::forecast::{real_column, require_artifact, RAIN_CLASS_COLUMN};
use crate::model::exceeds_threshold;
use crate::model::metrics::{mae, median_ae, r2, roc_auc, Confusion};
use crate::types::variable::Variable;
use log::{info, warn};
use std::fmt;

const MCC_HINT_BELOW: f64 = 0.5;

/// One-step against recursive error for one regression target.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionComparison {
    pub target: Target,
    pub rows: usize,
    pub one_step_mae: f64,
    pub one_step_median_ae: f64,
    pub one_step_r2: f64,
    pub recursive_mae: f64,
    /// Relative MAE increase of the recursive run, in percent.
    pub degradation_pct: f64,
}

impl fmt::Display for RegressionComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} | MAE {:>7.3} | MedAE {:>7.3} | R2 {:>6.3} || recursive MAE {:>7.3} | {:+.0}%",
            self.target.name(),
            self.one_step_mae,
            self.one_step_median_ae,
            self.one_step_r2,
            self.recursive_mae,
            self.degradation_pct
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationScores {
    /// `None` when the evaluated days are all wet or all dry.
    pub auc: Option<f64>,
    pub accuracy: f64,
    pub f1: f64,
    pub mcc: f64,
}

impl ClassificationScores {
    fn score(wet: &[bool], probabilities: &[f64], predicted: &[bool]) -> Self {
        let confusion = Confusion::from_predictions(wet, predicted);
        Self {
            auc: roc_auc(wet, probabilities),
            accuracy: confusion.accuracy(),
            f1: confusion.f1(),
            mcc: confusion.mcc(),
        }
    }
}

impl fmt::Display for ClassificationScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.auc {
            Some(auc) => write!(f, "AUC {auc:.3}")?,
            None => write!(f, "AUC n/a")?,
        }
        write!(
            f,
            " | accuracy {:.3} | F1 {:.3} | MCC {:.3}",
            self.accuracy, self.f1, self.mcc
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RainComparison {
    pub rows: usize,
    pub one_step: ClassificationScores,
    pub recursive: ClassificationScores,
}

/// Metrics of both forecasting modes over the (station, date) keys they share.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparativeReport {
    pub regression: Vec<RegressionComparison>,
    pub rain: Option<RainComparison>,
}

impl ComparativeReport {
    /// Joins `one_step` and `recursive` on their keys. Real values are taken
    /// from the one-step table; rows where either side lacks a value are left
    /// out of that target's metrics.
    pub fn compare(one_step: &ForecastTable, recursive: &ForecastTable, model: &ModelConfig) -> Self {
        let index = recursive.index();
        let joined: Vec<(usize, usize)> = one_step
            .keys()
            .enumerate()
            .filter_map(|(row, (code, date))| index.get(&(code.to_string(), date)).map(|r| (row, *r)))
            .collect();

        let regression = Target::ALL
            .into_iter()
            .filter(|t| !t.is_classification())
            .filter_map(|t| compare_regression(t, one_step, recursive, &joined))
            .collect();
        let rain = compare_rain(one_step, recursive, &joined, model);
        Self { regression, rain }
    }

    pub fn log(&self, rain_threshold: f64) {
        info!("Regression, one-step vs recursive:");
        for row in &self.regression {
            info!("  {row}");
        }
        let Some(rain) = &self.rain else {
            warn!("No rain predictions to compare");
            return;
        };
        info!("Rain classification over {} days:", rain.rows);
        info!("  one-step  {}", rain.one_step);
        info!("  recursive {}", rain.recursive);
        if rain.one_step.mcc < MCC_HINT_BELOW {
            info!(
                "MCC {:.3} means the classifier is conservative; consider lowering rain_threshold (currently {})",
                rain.one_step.mcc, rain_threshold
            );
        }
    }
}

fn joined_values(
    column: Option<&[Option<f64>]>,
    joined: &[(usize, usize)],
    side: impl Fn(&(usize, usize)) -> usize,
) -> Option<Vec<Option<f64>>> {
    let column = column?;
    Some(joined.iter().map(|pair| column[side(pair)]).collect())
}

fn compare_regression(
    target: Target,
    one_step: &ForecastTable,
    recursive: &ForecastTable,
    joined: &[(usize, usize)],
) -> Option<RegressionComparison> {
    let name = target.prediction_column();
    let real = joined_values(one_step.column(&real_column(target.variable())), joined, |p| p.0)?;
    let os = joined_values(one_step.column(&name), joined, |p| p.0)?;
    let rec = joined_values(recursive.column(&name), joined, |p| p.1)?;

    let mut y = Vec::new();
    let mut y_os = Vec::new();
    let mut y_rec = Vec::new();
    for ((real, os), rec) in real.into_iter().zip(os).zip(rec) {
        if let (Some(real), Some(os), Some(rec)) = (real, os, rec) {
            y.push(real);
            y_os.push(os);
            y_rec.push(rec);
        }
    }
    if y.is_empty() {
        return None;
    }
    let one_step_mae = mae(&y, &y_os);
    let recursive_mae = mae(&y, &y_rec);
    let degradation_pct = if one_step_mae > 0.0 {
        (recursive_mae - one_step_mae) / one_step_mae * 100.0
    } else {
        0.0
    };
    Some(RegressionComparison {
        target,
        rows: y.len(),
        one_step_mae,
        one_step_median_ae: median_ae(&y, &y_os),
        one_step_r2: r2(&y, &y_os),
        recursive_mae,
        degradation_pct,
    })
}

fn compare_rain(
    one_step: &ForecastTable,
    recursive: &ForecastTable,
    joined: &[(usize, usize)],
    model: &ModelConfig,
) -> Option<RainComparison> {
    let prob = Target::Rain.prediction_column();
    let real = joined_values(one_step.column(&real_column(Variable::Prcp)), joined, |p| p.0)?;
    let os = joined_values(one_step.column(&prob), joined, |p| p.0)?;
    let os_class = joined_values(one_step.column(RAIN_CLASS_COLUMN), joined, |p| p.0);
    let rec = joined_values(recursive.column(&prob), joined, |p| p.1)?;

    let mut wet = Vec::new();
    let mut p_os = Vec::new();
    let mut c_os = Vec::new();
    let mut p_rec = Vec::new();
    for (i, ((real, os), rec)) in real.into_iter().zip(os).zip(rec).enumerate() {
        let (Some(real), Some(os), Some(rec)) = (real, os, rec) else {
            continue;
        };
        let class = os_class
            .as_ref()
            .and_then(|c| c[i])
            .map(|c| c >= 0.5)
            .unwrap_or_else(|| exceeds_threshold(os, model.rain_threshold));
        wet.push(real > model.wet_day_threshold);
        p_os.push(os);
        c_os.push(class);
        p_rec.push(rec);
    }
    if wet.is_empty() {
        return None;
    }
    let c_rec: Vec<bool> = p_rec.iter().map(|p| exceeds_threshold(*p, model.rain_threshold)).collect();
    Some(RainComparison {
        rows: wet.len(),
        one_step: ClassificationScores::score(&wet, &p_os, &c_os),
        recursive: ClassificationScores::score(&wet, &p_rec, &c_rec),
    })
}

/// Reads both forecasts for the target year and logs their comparison.
pub async fn run_report(config: &PipelineConfig) -> Result<ComparativeReport, ForecastError> {
    let year = config.experiment.target_year;
    let one_step = ForecastTable::read_csv(&config.paths.one_step_forecast(year))
        .await
        .map_err(|e| require_artifact(e, "forecast"))?;
    let recursive = ForecastTable::read_csv(&config.paths.recursive_forecast(year))
        .await
        .map_err(|e| require_artifact(e, "simulate"))?;

    let report = ComparativeReport::compare(&one_step, &recursive, &config.model);
    report.log(config.model.rain_threshold);
    Ok(report)
}
