//! Row-wise scores derived from a forecast table.

pub mod apparent_temperature;
pub mod rainbow;

use crate::config::PathsConfig;
use crate::dataset::error::DatasetError;
use crate::dataset::forecast_table::ForecastTable;
use crate::forecast::target::Target;
use crate::heuristics::apparent_temperature::apparent_temperature;
use crate::heuristics::rainbow::rainbow_probability;
use log::{info, warn};

pub const RAINBOW_COLUMN: &str = "rainbow_prob";
pub const APPARENT_TEMPERATURE_COLUMN: &str = "pred_windchill";

/// Forecast wind speed is in m/s.
const MS_TO_KMH: f64 = 3.6;

/// Appends `rainbow_prob` and `pred_windchill`. A score is left empty on rows
/// missing one of its inputs, and skipped entirely when an input column was
/// never predicted.
pub fn apply(table: &mut ForecastTable) {
    let [rain, tsun, rhum, tavg, wspd] = [Target::Rain, Target::Tsun, Target::Rhum, Target::Tavg, Target::Wspd]
        .map(|target| table.column(&target.prediction_column()).map(<[_]>::to_vec));

    match (&rain, &tsun, &rhum) {
        (Some(rain), Some(sun), Some(rhum)) => {
            let scores = rain
                .iter()
                .zip(sun)
                .zip(rhum)
                .map(|((p, s), h)| Some(rainbow_probability((*p)?, (*s)?, (*h)?)))
                .collect();
            table.set_column(RAINBOW_COLUMN, scores);
        }
        _ => warn!("Skipping {RAINBOW_COLUMN}: rain, tsun and rhum predictions are all required"),
    }

    match (&tavg, &wspd, &rhum) {
        (Some(tavg), Some(wspd), Some(rhum)) => {
            let felt = tavg
                .iter()
                .zip(wspd)
                .zip(rhum)
                .map(|((t, v), h)| Some(apparent_temperature((*t)?, (*v)? * MS_TO_KMH, (*h)?)))
                .collect();
            table.set_column(APPARENT_TEMPERATURE_COLUMN, felt);
        }
        _ => warn!("Skipping {APPARENT_TEMPERATURE_COLUMN}: tavg, wspd and rhum predictions are all required"),
    }
}

/// Applies the scores to a copy of `table` and writes it as the final forecast.
pub async fn write_final_forecast(paths: &PathsConfig, table: &ForecastTable) -> Result<ForecastTable, DatasetError> {
    let mut enriched = table.clone();
    apply(&mut enriched);
    let path = paths.final_forecast();
    enriched.write_csv(&path).await?;
    info!("Wrote final forecast with heuristic scores to {}", path.display());
    Ok(enriched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ymd;
    use tempfile::TempDir;

    fn forecast() -> ForecastTable {
        let mut table = ForecastTable::new(vec![
            ("0076".to_string(), ymd(2025, 4, 1)),
            ("0076".to_string(), ymd(2025, 4, 2)),
        ]);
        table.set_column("pred_prob_rain", vec![Some(0.6), None]);
        table.set_column("pred_tsun", vec![Some(6.0), Some(9.0)]);
        table.set_column("pred_rhum", vec![Some(80.0), Some(60.0)]);
        table.set_column("pred_tavg", vec![Some(20.0), Some(0.0)]);
        table.set_column("pred_wspd", vec![Some(2.5), Some(20.0 / 3.6)]);
        table
    }

    #[test]
    fn appends_both_scores() {
        let mut table = forecast();
        apply(&mut table);
        assert_eq!(table.column(RAINBOW_COLUMN).unwrap(), &[Some(57.6), None]);
        let felt = table.column(APPARENT_TEMPERATURE_COLUMN).unwrap();
        assert_eq!(felt[0], Some(apparent_temperature(20.0, 9.0, 80.0)));
        assert_eq!(felt[1], Some(apparent_temperature(0.0, 20.0, 60.0)));
    }

    #[test]
    fn missing_inputs_skip_the_score() {
        let mut table = ForecastTable::new(vec![("0076".to_string(), ymd(2025, 4, 1))]);
        table.set_column("pred_tavg", vec![Some(12.0)]);
        apply(&mut table);
        assert!(table.column(RAINBOW_COLUMN).is_none());
        assert!(table.column(APPARENT_TEMPERATURE_COLUMN).is_none());
    }

    #[tokio::test]
    async fn writes_the_final_forecast() -> Result<(), DatasetError> {
        let dir = TempDir::new().unwrap();
        let paths = PathsConfig::builder().root(dir.path()).build();
        let enriched = write_final_forecast(&paths, &forecast()).await?;
        let read = ForecastTable::read_csv(&paths.final_forecast()).await?;
        assert_eq!(read.column(RAINBOW_COLUMN), enriched.column(RAINBOW_COLUMN));
        Ok(())
    }
}
