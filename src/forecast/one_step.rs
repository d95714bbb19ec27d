use crate::config::PipelineConfig;
use crate::dataset::clean::read_clean_dataset;
use crate::dataset::forecast_table::ForecastTable;
use crate::features::engineer::FeatureEngineer;
use crate::features::frame::FeatureFrame;
use crate::forecast::error::ForecastError;
use crate::forecast::target::Target;
use crate::forecast::{load_models, real_column, require_artifact, RAIN_CLASS_COLUMN, REAL_VARIABLES};
use crate::model::exceeds_threshold;
use crate::model::persistence::TrainedModel;
use chrono::{Datelike, Duration};
use log::info;

/// Next-day forecasts from fully observed features.
///
/// The prediction for day `d` uses the features of day `d - 1`, all of which
/// are real observations, so this is the accuracy ceiling the recursive
/// simulator is compared against. The first day of the year is predicted from
/// the last day of the previous year when that day is in the frame.
pub struct OneStepForecaster<'a> {
    models: &'a [TrainedModel],
    rain_threshold: f64,
}

impl<'a> OneStepForecaster<'a> {
    pub fn new(models: &'a [TrainedModel], rain_threshold: f64) -> Self {
        Self {
            models,
            rain_threshold,
        }
    }

    pub fn forecast(&self, frame: &FeatureFrame, year: i32) -> Result<ForecastTable, ForecastError> {
        let mut keys = Vec::new();
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        for (code, range) in frame.groups() {
            for row in range.clone().skip(1) {
                let date = frame.date(row);
                if date.year() != year || frame.date(row - 1) + Duration::days(1) != date {
                    continue;
                }
                keys.push((code.clone(), date));
                pairs.push((row - 1, row));
            }
        }
        if keys.is_empty() {
            return Err(ForecastError::NoDataForYear(year));
        }

        let mut table = ForecastTable::new(keys);
        for variable in REAL_VARIABLES {
            if let Some(values) = frame.column(variable.column()) {
                let real = pairs
                    .iter()
                    .map(|(_, row)| Some(values[*row]).filter(|v| v.is_finite()))
                    .collect();
                table.set_column(&real_column(variable), real);
            }
        }

        for model in self.models {
            let alignment = model.align(frame);
            let predictions: Vec<Option<f64>> = pairs
                .iter()
                .map(|(source, _)| Some(model.forecast_row(frame, *source, &alignment)))
                .collect();
            if model.target() == Target::Rain {
                let classes = predictions
                    .iter()
                    .map(|p| p.map(|p| f64::from(exceeds_threshold(p, self.rain_threshold))))
                    .collect();
                table.set_column(&model.target().prediction_column(), predictions);
                table.set_column(RAIN_CLASS_COLUMN, classes);
            } else {
                table.set_column(&model.target().prediction_column(), predictions);
            }
        }
        Ok(table)
    }
}

/// Runs the one-step forecast for the configured target year and writes it
/// under the predictions directory.
pub async fn run_one_step(config: &PipelineConfig) -> Result<ForecastTable, ForecastError> {
    let year = config.experiment.target_year;
    let series = read_clean_dataset(&config.paths.clean_dataset())
        .await
        .map_err(|e| require_artifact(e, "process"))?;
    let models = load_models(&config.paths).await?;

    let owned = config.clone();
    let table = tokio::task::spawn_blocking(move || {
        let frame = FeatureEngineer::new(&owned.features).build(&series);
        OneStepForecaster::new(&models, owned.model.rain_threshold).forecast(&frame, year)
    })
    .await??;

    let path = config.paths.one_step_forecast(year);
    table.write_csv(&path).await?;
    info!("Wrote {} one-step predictions to {}", table.len(), path.display());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ymd, FeatureConfig};
    use crate::forecast::fixtures::{quick_models, synthetic_series};
    use crate::types::variable::Variable;

    #[test]
    fn predicts_each_day_from_the_previous_one() -> Result<(), ForecastError> {
        let series = synthetic_series(&["0076", "0201D"], ymd(2020, 1, 1), ymd(2021, 12, 31));
        let features = FeatureConfig::default();
        let frame = FeatureEngineer::new(&features).build(&series);
        let models = quick_models(&frame, &[Target::Tavg, Target::Rain]);
        assert_eq!(models.len(), 2);

        let table = OneStepForecaster::new(&models, 0.3).forecast(&frame, 2021)?;
        assert_eq!(table.len(), 2 * 365);
        assert_eq!(table.date(0), ymd(2021, 1, 1));

        let index = table.index();
        let row = index[&("0201D".to_string(), ymd(2021, 3, 10))];
        let source = frame
            .groups()
            .iter()
            .find(|(c, _)| c == "0201D")
            .map(|(_, r)| r.start)
            .unwrap()
            + series[1].index_of(ymd(2021, 3, 9)).unwrap();
        let tavg = &models[0];
        let expected = tavg.forecast_row(&frame, source, &tavg.align(&frame));
        assert_eq!(table.column("pred_tavg").unwrap()[row], Some(expected));
        let observed = series[1].index_of(ymd(2021, 3, 10)).unwrap();
        assert_eq!(
            table.column("real_tavg").unwrap()[row],
            series[1].value_at(Variable::Tavg, observed)
        );

        let probs = table.column("pred_prob_rain").unwrap();
        let classes = table.column(RAIN_CLASS_COLUMN).unwrap();
        for (p, c) in probs.iter().zip(classes) {
            let p = p.unwrap();
            assert!((0.0..=1.0).contains(&p));
            assert_eq!(c.unwrap(), if p > 0.3 { 1.0 } else { 0.0 });
        }
        Ok(())
    }

    #[test]
    fn year_without_rows_is_an_error() {
        let series = synthetic_series(&["0076"], ymd(2020, 1, 1), ymd(2020, 3, 31));
        let features = FeatureConfig::default();
        let frame = FeatureEngineer::new(&features).build(&series);
        let err = OneStepForecaster::new(&[], 0.3).forecast(&frame, 2030).unwrap_err();
        assert!(matches!(err, ForecastError::NoDataForYear(2030)));
    }
}
