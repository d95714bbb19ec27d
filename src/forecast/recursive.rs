//! Multi-day simulation in which each day's inputs include the model's own
//! earlier predictions.

use crate::config::PipelineConfig;
use crate::dataset::clean::read_clean_dataset;
use crate::dataset::forecast_table::ForecastTable;
use crate::features::engineer::FeatureEngineer;
use crate::forecast::error::ForecastError;
use crate::forecast::target::Target;
use crate::forecast::{load_models, real_column, require_artifact, RAIN_CLASS_COLUMN, REAL_VARIABLES};
use crate::model::exceeds_threshold;
use crate::model::persistence::TrainedModel;
use crate::types::series::CanonicalSeries;
use crate::types::variable::Variable;
use bon::bon;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};

const PROGRESS_EVERY_DAYS: usize = 30;
const DAYS_PER_HORIZON_MONTH: usize = 30;

/// Synthetic precipitation column written alongside the rain probability.
pub const SYNTHETIC_PRECIP_COLUMN: &str = "pred_prcp";

/// Error growth of one regression target over the horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct DegradationCurve {
    pub target: Target,
    /// MAE per day since the cutoff, `None` where no real value exists.
    pub by_day: Vec<Option<f64>>,
    /// MAE per 30-day block since the cutoff.
    pub by_month: Vec<Option<f64>>,
}

impl DegradationCurve {
    /// Builds the curve from `(day_index, absolute_error)` pairs.
    pub fn from_errors(target: Target, horizon_days: usize, errors: &[(usize, f64)]) -> Self {
        let months = horizon_days.div_ceil(DAYS_PER_HORIZON_MONTH);
        let mut days = vec![(0.0, 0usize); horizon_days];
        let mut blocks = vec![(0.0, 0usize); months];
        for (day, error) in errors {
            if *day >= horizon_days || !error.is_finite() {
                continue;
            }
            days[*day].0 += error;
            days[*day].1 += 1;
            let block = &mut blocks[day / DAYS_PER_HORIZON_MONTH];
            block.0 += error;
            block.1 += 1;
        }
        let mean = |(sum, n): (f64, usize)| (n > 0).then(|| sum / n as f64);
        Self {
            target,
            by_day: days.into_iter().map(mean).collect(),
            by_month: blocks.into_iter().map(mean).collect(),
        }
    }

    pub fn log(&self) {
        let months: Vec<String> = self
            .by_month
            .iter()
            .enumerate()
            .map(|(i, mae)| match mae {
                Some(mae) => format!("M{}={:.2}", i + 1, mae),
                None => format!("M{}=n/a", i + 1),
            })
            .collect();
        info!("{} MAE by month of horizon: {}", self.target, months.join(" "));
    }
}

/// Output of a simulation run.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub table: ForecastTable,
    pub degradation: Vec<DegradationCurve>,
}

/// Feeds predictions back as history, one day at a time.
///
/// The simulator owns a copy of each station's history before the cutoff and
/// appends one synthetic day per iteration. Features are recomputed over the
/// trailing `lookback` rows only; the lookback is widened to the longest lag or
/// rolling window in use, so the last row's features equal those a full
/// history rebuild would produce.
pub struct RecursiveSimulator<'a> {
    config: &'a PipelineConfig,
    models: &'a [TrainedModel],
}

#[bon]
impl<'a> RecursiveSimulator<'a> {
    pub fn new(config: &'a PipelineConfig, models: &'a [TrainedModel]) -> Self {
        Self { config, models }
    }

    /// Trailing rows used to rebuild features each day.
    pub fn lookback(&self) -> usize {
        let engineer = FeatureEngineer::new(&self.config.features);
        self.config
            .experiment
            .lookback_days
            .max(engineer.required_lookback() + 1)
    }

    /// Simulates `horizon_days` days per station starting at `cutoff`, reading
    /// only rows of `history` dated before `cutoff`. Real values on or after
    /// the cutoff are joined in afterwards for the degradation curves.
    ///
    /// Defaults come from the experiment configuration.
    #[builder]
    pub fn simulate(
        &self,
        history: &[CanonicalSeries],
        cutoff: Option<NaiveDate>,
        horizon_days: Option<usize>,
    ) -> Result<Simulation, ForecastError> {
        let cutoff = cutoff.unwrap_or_else(|| self.config.experiment.cutoff());
        let horizon = horizon_days.unwrap_or(self.config.experiment.horizon_days);
        let engineer = FeatureEngineer::new(&self.config.features);
        let lookback = self.lookback();
        // Encoded over every station of the dataset, as at training time.
        let station_ids = FeatureEngineer::station_ids(history);

        let mut world: Vec<CanonicalSeries> = history
            .iter()
            .map(|s| s.truncated_before(cutoff))
            .filter(|s| !s.is_empty())
            .collect();
        if world.is_empty() {
            return Err(ForecastError::NoHistory(cutoff));
        }
        if world.len() < history.len() {
            warn!(
                "{} stations have no history before {} and are not simulated",
                history.len() - world.len(),
                cutoff
            );
        }
        info!(
            "Simulating {} days for {} stations from {} (lookback {} days)",
            horizon,
            world.len(),
            cutoff,
            lookback
        );

        let names = engineer.feature_names();
        let template = crate::features::frame::FeatureFrame::new(names);
        let alignments: Vec<Vec<Option<usize>>> = self.models.iter().map(|m| m.align(&template)).collect();
        let rain_threshold = self.config.model.rain_threshold;
        let wet_precip = self.config.model.synthetic_wet_precip;

        let mut keys: Vec<(String, NaiveDate)> = Vec::with_capacity(horizon * world.len());
        let mut day_index: Vec<usize> = Vec::with_capacity(horizon * world.len());
        let mut predictions: BTreeMap<Target, Vec<f64>> = BTreeMap::new();
        let mut synthetic_precip: Vec<f64> = Vec::new();

        for day in 0..horizon {
            let frame = engineer.build_tail(&world, lookback, &station_ids);
            for series in world.iter_mut() {
                let Some(row) = frame.last_row_of(series.code()) else {
                    continue;
                };
                let mut next: BTreeMap<Variable, f64> = BTreeMap::new();
                for (model, alignment) in self.models.iter().zip(&alignments) {
                    let target = model.target();
                    let value = model.forecast_row(&frame, row, alignment);
                    predictions.entry(target).or_default().push(value);
                    if target == Target::Rain {
                        let precip = if exceeds_threshold(value, rain_threshold) { wet_precip } else { 0.0 };
                        next.insert(Variable::Prcp, precip);
                    } else {
                        next.insert(target.variable(), value);
                    }
                }
                synthetic_precip.push(next.get(&Variable::Prcp).copied().unwrap_or(f64::NAN));
                let date = series.push_day(&next, true);
                keys.push((series.code().to_string(), date));
                day_index.push(day);
            }
            if (day + 1) % PROGRESS_EVERY_DAYS == 0 {
                info!("Simulated {}/{} days", day + 1, horizon);
            }
        }

        let mut table = ForecastTable::new(keys);
        let by_code: HashMap<&str, &CanonicalSeries> = history.iter().map(|s| (s.code(), s)).collect();
        for variable in REAL_VARIABLES {
            let real: Vec<Option<f64>> = table
                .keys()
                .map(|(code, date)| {
                    let series = by_code.get(code)?;
                    let row = series.index_of(date)?;
                    series.value_at(variable, row).filter(|v| v.is_finite())
                })
                .collect();
            table.set_column(&real_column(variable), real);
        }

        let mut degradation = Vec::new();
        for (target, values) in &predictions {
            table.set_column(
                &target.prediction_column(),
                values.iter().copied().map(Some).collect(),
            );
            if target.is_classification() {
                table.set_column(
                    RAIN_CLASS_COLUMN,
                    values
                        .iter()
                        .map(|p| Some(f64::from(exceeds_threshold(*p, rain_threshold))))
                        .collect(),
                );
                table.set_column(
                    SYNTHETIC_PRECIP_COLUMN,
                    synthetic_precip.iter().map(|v| Some(*v).filter(|v| v.is_finite())).collect(),
                );
                continue;
            }
            let Some(real) = table.column(&real_column(target.variable())) else {
                continue;
            };
            let errors: Vec<(usize, f64)> = real
                .iter()
                .zip(values)
                .zip(&day_index)
                .filter_map(|((real, predicted), day)| real.map(|r| (*day, (r - predicted).abs())))
                .collect();
            let curve = DegradationCurve::from_errors(*target, horizon, &errors);
            curve.log();
            degradation.push(curve);
        }

        Ok(Simulation { table, degradation })
    }
}

/// Runs the recursive simulation with the configured cutoff and horizon, or
/// the given overrides, and writes the result under the predictions directory.
pub async fn run_recursive(
    config: &PipelineConfig,
    cutoff: Option<NaiveDate>,
    horizon_days: Option<usize>,
) -> Result<Simulation, ForecastError> {
    let series = read_clean_dataset(&config.paths.clean_dataset())
        .await
        .map_err(|e| require_artifact(e, "process"))?;
    let models = load_models(&config.paths).await?;

    let owned = config.clone();
    let simulation = tokio::task::spawn_blocking(move || {
        RecursiveSimulator::new(&owned, &models)
            .simulate()
            .history(&series)
            .maybe_cutoff(cutoff)
            .maybe_horizon_days(horizon_days)
            .call()
    })
    .await??;

    let path = config.paths.recursive_forecast(config.experiment.target_year);
    simulation.table.write_csv(&path).await?;
    info!(
        "Wrote {} recursive predictions to {}",
        simulation.table.len(),
        path.display()
    );
    Ok(simulation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ymd, ExperimentConfig};
    use crate::forecast::fixtures::{quick_models, synthetic_series};
    use crate::forecast::one_step::OneStepForecaster;
    use crate::forecast::report::ComparativeReport;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn setup() -> (PipelineConfig, Vec<CanonicalSeries>, Vec<TrainedModel>) {
        let config = PipelineConfig::default();
        let series = synthetic_series(&["0076", "0201D"], ymd(2020, 1, 1), ymd(2021, 3, 31));
        let frame = FeatureEngineer::new(&config.features).build(&series);
        let models = quick_models(&frame, &[Target::Tavg, Target::Tsun, Target::Rain]);
        (config, series, models)
    }

    #[test]
    fn produces_one_row_per_station_and_day() -> Result<(), ForecastError> {
        let (config, series, models) = setup();
        let simulation = RecursiveSimulator::new(&config, &models)
            .simulate()
            .history(&series)
            .cutoff(ymd(2021, 1, 1))
            .horizon_days(45)
            .call()?;

        let table = &simulation.table;
        assert_eq!(table.len(), 2 * 45);
        assert_eq!(table.date(0), ymd(2021, 1, 1));
        assert_eq!(table.date(2), ymd(2021, 1, 2));
        assert_eq!(table.date(table.len() - 1), ymd(2021, 2, 14));

        let tsun = table.column("pred_tsun").unwrap();
        assert!(tsun.iter().all(|v| (0.0..=16.0).contains(&v.unwrap())));
        let precip = table.column(SYNTHETIC_PRECIP_COLUMN).unwrap();
        let classes = table.column(RAIN_CLASS_COLUMN).unwrap();
        for (p, c) in precip.iter().zip(classes) {
            assert_eq!(p.unwrap() > 0.0, c.unwrap() == 1.0);
        }
        assert!(table.column("real_tavg").unwrap().iter().all(Option::is_some));

        let curve = simulation
            .degradation
            .iter()
            .find(|c| c.target == Target::Tavg)
            .unwrap();
        assert_eq!(curve.by_day.len(), 45);
        assert_eq!(curve.by_month.len(), 2);
        Ok(())
    }

    #[test]
    fn never_reads_data_after_the_cutoff() -> Result<(), ForecastError> {
        let (config, series, models) = setup();
        let cutoff = ymd(2021, 1, 1);
        let mut perturbed = series.clone();
        for s in &mut perturbed {
            let start = s.index_of(cutoff).unwrap();
            for v in &mut s.values_mut(Variable::Tavg)[start..] {
                *v += 50.0;
            }
        }
        let simulator = RecursiveSimulator::new(&config, &models);
        let run = |history: &[CanonicalSeries]| {
            simulator
                .simulate()
                .history(history)
                .cutoff(cutoff)
                .horizon_days(10)
                .call()
        };
        let a = run(&series)?;
        let b = run(&perturbed)?;
        assert_eq!(a.table.column("pred_tavg"), b.table.column("pred_tavg"));
        assert_ne!(a.table.column("real_tavg"), b.table.column("real_tavg"));
        Ok(())
    }

    #[test]
    fn short_lookback_is_widened() -> Result<(), ForecastError> {
        let (mut config, series, models) = setup();
        let wide = RecursiveSimulator::new(&config, &models)
            .simulate()
            .history(&series)
            .cutoff(ymd(2021, 1, 1))
            .horizon_days(5)
            .call()?;

        config.experiment = ExperimentConfig::builder().lookback_days(3).build();
        let simulator = RecursiveSimulator::new(&config, &models);
        assert_eq!(simulator.lookback(), 14);
        let narrow = simulator
            .simulate()
            .history(&series)
            .cutoff(ymd(2021, 1, 1))
            .horizon_days(5)
            .call()?;
        assert_eq!(wide.table, narrow.table);
        Ok(())
    }

    #[test]
    fn missing_history_is_an_error() {
        let (config, series, models) = setup();
        let err = RecursiveSimulator::new(&config, &models)
            .simulate()
            .history(&series)
            .cutoff(ymd(2019, 1, 1))
            .call()
            .unwrap_err();
        assert!(matches!(err, ForecastError::NoHistory(_)));
    }

    #[test]
    fn degradation_averages_per_day_and_block() {
        let errors = [(0, 1.0), (0, 3.0), (31, 4.0), (59, 6.0), (80, f64::NAN)];
        let curve = DegradationCurve::from_errors(Target::Tmax, 61, &errors);
        assert_eq!(curve.by_day[0], Some(2.0));
        assert_eq!(curve.by_day[1], None);
        assert_eq!(curve.by_month, vec![Some(2.0), Some(5.0), None]);
    }

    #[test]
    fn errors_do_not_shrink_along_the_horizon() -> Result<(), ForecastError> {
        let config = PipelineConfig::default();
        let mut series = synthetic_series(&["0076", "0201D"], ymd(2019, 1, 1), ymd(2021, 12, 31));
        // Day-to-day noise no model can anticipate.
        let mut rng = StdRng::seed_from_u64(11);
        for s in &mut series {
            for v in s.values_mut(Variable::Tavg) {
                *v += rng.gen_range(-3.0..3.0);
            }
        }
        let frame = FeatureEngineer::new(&config.features).build(&series);
        let models = quick_models(&frame, &[Target::Tavg]);
        assert_eq!(models.len(), 1);

        let simulation = RecursiveSimulator::new(&config, &models)
            .simulate()
            .history(&series)
            .cutoff(ymd(2021, 1, 1))
            .horizon_days(120)
            .call()?;
        let curve = simulation
            .degradation
            .iter()
            .find(|c| c.target == Target::Tavg)
            .unwrap();
        let first = curve.by_month[0].unwrap();
        let last = curve.by_month[3].unwrap();
        assert!(first > 0.0);
        assert!(last >= first * 0.7, "last block MAE {last} vs first {first}");

        let one_step = OneStepForecaster::new(&models, config.model.rain_threshold).forecast(&frame, 2021)?;
        let report = ComparativeReport::compare(&one_step, &simulation.table, &config.model);
        let tavg = report
            .regression
            .iter()
            .find(|r| r.target == Target::Tavg)
            .unwrap();
        assert_eq!(tavg.rows, 2 * 120);
        assert!(
            tavg.recursive_mae >= tavg.one_step_mae * 0.9,
            "recursive MAE {} vs one-step {}",
            tavg.recursive_mae,
            tavg.one_step_mae
        );
        Ok(())
    }

    #[test]
    fn stations_keep_their_encoding_when_others_lack_history() -> Result<(), ForecastError> {
        let (config, series, models) = setup();
        let cutoff = ymd(2021, 1, 1);
        // Same code, but nothing before the cutoff.
        let late = synthetic_series(&["0076"], cutoff, ymd(2021, 3, 31)).remove(0);
        let partial = vec![late, series[1].clone()];

        let simulator = RecursiveSimulator::new(&config, &models);
        let run = |history: &[CanonicalSeries]| {
            simulator
                .simulate()
                .history(history)
                .cutoff(cutoff)
                .horizon_days(10)
                .call()
        };
        let full = run(&series)?;
        let reduced = run(&partial)?;
        assert_eq!(reduced.table.len(), 10);

        let of_station = |table: &ForecastTable| -> Vec<Option<f64>> {
            let preds = table.column("pred_tavg").unwrap();
            table
                .keys()
                .zip(preds)
                .filter(|((code, _), _)| *code == "0201D")
                .map(|(_, p)| *p)
                .collect()
        };
        assert_eq!(of_station(&full.table), of_station(&reduced.table));
        Ok(())
    }
}
