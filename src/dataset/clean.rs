//! The clean dataset: every canonical series flattened into one CSV with a row
//! per (station, date), each variable and its `<variable>_est` flag.

use crate::dataset::error::DatasetError;
use crate::dataset::{
    float_values, parse_date, parse_flag, read_text_frame, required, text_values, write_frame,
    DATE_FORMAT,
};
use crate::types::series::CanonicalSeries;
use crate::types::station::StationMeta;
use crate::types::variable::Variable;
use log::info;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;

pub const DATE_COLUMN: &str = "date";
pub const STATION_COLUMN: &str = "station";

/// Writes every series to `path`, stations in the given order, dates ascending.
pub async fn write_clean_dataset(series: &[CanonicalSeries], path: &Path) -> Result<(), DatasetError> {
    let df = series_to_frame(series)?;
    write_frame(df, path).await?;
    info!("Clean dataset saved with {} stations", series.len());
    Ok(())
}

/// Reads the clean dataset back into one series per station, ordered by code.
///
/// # Errors
///
/// [`DatasetError::Missing`] if the file does not exist, which callers treat
/// as fatal for their stage.
pub async fn read_clean_dataset(path: &Path) -> Result<Vec<CanonicalSeries>, DatasetError> {
    let df = read_text_frame(path).await?;
    let series = frame_to_series(&df)?;
    info!(
        "Loaded clean dataset from {}: {} stations, {} rows",
        path.display(),
        series.len(),
        df.height()
    );
    Ok(series)
}

pub(crate) fn series_to_frame(series: &[CanonicalSeries]) -> PolarsResult<DataFrame> {
    let rows: usize = series.iter().map(CanonicalSeries::len).sum();
    let mut dates = Vec::with_capacity(rows);
    let mut stations = Vec::with_capacity(rows);
    let mut names: Vec<Option<String>> = Vec::with_capacity(rows);
    let mut provinces: Vec<Option<String>> = Vec::with_capacity(rows);
    let mut altitudes: Vec<Option<f64>> = Vec::with_capacity(rows);
    let mut values: BTreeMap<Variable, Vec<f64>> = BTreeMap::new();
    let mut flags: BTreeMap<Variable, Vec<bool>> = BTreeMap::new();

    for s in series {
        for date in s.dates() {
            dates.push(date.format(DATE_FORMAT).to_string());
            stations.push(s.code().to_string());
            names.push(s.meta.name.clone());
            provinces.push(s.meta.province.clone());
            altitudes.push(s.meta.altitude);
        }
        for variable in Variable::ALL {
            values
                .entry(variable)
                .or_default()
                .extend_from_slice(s.values(variable));
            flags
                .entry(variable)
                .or_default()
                .extend_from_slice(s.estimated(variable));
        }
    }

    let mut columns = vec![
        Column::new(DATE_COLUMN.into(), dates),
        Column::new(STATION_COLUMN.into(), stations),
        Column::new("name".into(), names),
        Column::new("province".into(), provinces),
        Column::new("altitude".into(), altitudes),
    ];
    for variable in Variable::ALL {
        columns.push(Column::new(
            variable.column().into(),
            values.remove(&variable).unwrap_or_default(),
        ));
    }
    for variable in Variable::ALL {
        columns.push(Column::new(
            variable.flag_column().into(),
            flags.remove(&variable).unwrap_or_default(),
        ));
    }
    DataFrame::new(columns)
}

pub(crate) fn frame_to_series(df: &DataFrame) -> Result<Vec<CanonicalSeries>, DatasetError> {
    let dates = text_values(required(df, DATE_COLUMN)?)?;
    let stations = text_values(required(df, STATION_COLUMN)?)?;
    let optional_text = |name: &str| -> Result<Vec<Option<String>>, DatasetError> {
        match df.column(name) {
            Ok(column) => text_values(column),
            Err(_) => Ok(vec![None; df.height()]),
        }
    };
    let names = optional_text("name")?;
    let provinces = optional_text("province")?;
    let altitudes = match df.column("altitude") {
        Ok(column) => float_values(column)?,
        Err(_) => vec![None; df.height()],
    };

    let mut variable_values = BTreeMap::new();
    let mut variable_flags = BTreeMap::new();
    for variable in Variable::ALL {
        if let Ok(column) = df.column(variable.column()) {
            variable_values.insert(variable, float_values(column)?);
        }
        let flag_name = variable.flag_column();
        if let Ok(column) = df.column(&flag_name) {
            let raw = text_values(column)?;
            let parsed = raw
                .iter()
                .enumerate()
                .map(|(row, v)| parse_flag(v.as_deref(), &flag_name, row))
                .collect::<Result<Vec<_>, _>>()?;
            variable_flags.insert(variable, parsed);
        }
    }

    let mut by_station: BTreeMap<String, Vec<(chrono::NaiveDate, usize)>> = BTreeMap::new();
    for (row, station) in stations.iter().enumerate() {
        let Some(code) = station else {
            return Err(DatasetError::InvalidValue {
                column: STATION_COLUMN.to_string(),
                row,
                value: String::new(),
            });
        };
        let date = parse_date(dates[row].as_deref(), DATE_COLUMN, row)?;
        by_station.entry(code.clone()).or_default().push((date, row));
    }

    let mut result = Vec::with_capacity(by_station.len());
    for (code, mut rows) in by_station {
        rows.sort_by_key(|(date, _)| *date);
        rows.dedup_by_key(|(date, _)| *date);
        let first_row = rows.first().map(|(_, row)| *row).unwrap_or_default();
        let meta = StationMeta {
            code,
            name: names[first_row].clone(),
            province: provinces[first_row].clone(),
            altitude: altitudes[first_row],
        };

        let mut values = BTreeMap::new();
        let mut estimated = BTreeMap::new();
        for (variable, column) in &variable_values {
            let dense = rows
                .iter()
                .map(|(_, row)| column[*row].unwrap_or(variable.default_fill()))
                .collect::<Vec<_>>();
            values.insert(*variable, dense);
        }
        for (variable, column) in &variable_flags {
            estimated.insert(*variable, rows.iter().map(|(_, row)| column[*row]).collect());
        }
        let dates = rows.iter().map(|(date, _)| *date).collect();
        result.push(CanonicalSeries::from_columns(meta, dates, values, estimated));
    }
    Ok(result)
}
