use crate::dataset::clean::{DATE_COLUMN, STATION_COLUMN};
use crate::dataset::error::DatasetError;
use crate::dataset::{float_values, parse_date, read_text_frame, required, text_values, write_frame, DATE_FORMAT};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Rows keyed by (station, date) with any number of optional numeric columns.
///
/// This is the shape of every forecast output: real values, one-step and
/// recursive predictions, and the heuristic scores appended afterwards. Column
/// order is insertion order and is preserved on disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastTable {
    stations: Vec<String>,
    dates: Vec<NaiveDate>,
    columns: Vec<(String, Vec<Option<f64>>)>,
}

impl ForecastTable {
    pub fn new(keys: Vec<(String, NaiveDate)>) -> Self {
        let (stations, dates) = keys.into_iter().unzip();
        Self {
            stations,
            dates,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn station(&self, row: usize) -> &str {
        &self.stations[row]
    }

    pub fn date(&self, row: usize) -> NaiveDate {
        self.dates[row]
    }

    pub fn keys(&self) -> impl Iterator<Item = (&str, NaiveDate)> + '_ {
        self.stations
            .iter()
            .map(String::as_str)
            .zip(self.dates.iter().copied())
    }

    /// Row position by (station, date).
    pub fn index(&self) -> HashMap<(String, NaiveDate), usize> {
        self.keys()
            .enumerate()
            .map(|(row, (station, date))| ((station.to_string(), date), row))
            .collect()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Adds or replaces a column. Short columns are padded with `None`.
    pub fn set_column(&mut self, name: &str, mut values: Vec<Option<f64>>) {
        values.resize(self.len(), None);
        match self.columns.iter().position(|(n, _)| n == name) {
            Some(idx) => self.columns[idx].1 = values,
            None => self.columns.push((name.to_string(), values)),
        }
    }

    /// Keeps only the rows for which `keep` returns true.
    pub fn retain_rows(&mut self, mut keep: impl FnMut(&str, NaiveDate) -> bool) {
        let mask: Vec<bool> = self.keys().map(|(s, d)| keep(s, d)).collect();
        retain_by_mask(&mut self.dates, &mask);
        retain_by_mask(&mut self.stations, &mask);
        for (_, values) in &mut self.columns {
            retain_by_mask(values, &mask);
        }
    }

    pub(crate) fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut columns = vec![
            Column::new(
                DATE_COLUMN.into(),
                self.dates
                    .iter()
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .collect::<Vec<_>>(),
            ),
            Column::new(STATION_COLUMN.into(), self.stations.clone()),
        ];
        for (name, values) in &self.columns {
            columns.push(Column::new(name.as_str().into(), values.clone()));
        }
        DataFrame::new(columns)
    }

    pub(crate) fn from_frame(df: &DataFrame) -> Result<Self, DatasetError> {
        let raw_dates = text_values(required(df, DATE_COLUMN)?)?;
        let stations = text_values(required(df, STATION_COLUMN)?)?;
        let mut keys = Vec::with_capacity(df.height());
        for (row, (date, station)) in raw_dates.iter().zip(stations).enumerate() {
            let date = parse_date(date.as_deref(), DATE_COLUMN, row)?;
            keys.push((station.unwrap_or_default(), date));
        }
        let mut table = ForecastTable::new(keys);
        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == DATE_COLUMN || name == STATION_COLUMN {
                continue;
            }
            table.set_column(name, float_values(column)?);
        }
        Ok(table)
    }

    pub async fn write_csv(&self, path: &Path) -> Result<(), DatasetError> {
        write_frame(self.to_frame()?, path).await
    }

    pub async fn read_csv(path: &Path) -> Result<Self, DatasetError> {
        let df = read_text_frame(path).await?;
        Self::from_frame(&df)
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, mask: &[bool]) {
    let mut keep = mask.iter();
    values.retain(|_| keep.next().copied().unwrap_or(false));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn table() -> ForecastTable {
        let mut table = ForecastTable::new(vec![
            ("0076".into(), date(1)),
            ("0076".into(), date(2)),
            ("0201D".into(), date(1)),
        ]);
        table.set_column("real_tavg", vec![Some(9.5), None, Some(11.0)]);
        table.set_column("pred_tavg", vec![Some(10.0), Some(10.5)]);
        table
    }

    #[test]
    fn columns_are_padded_and_replaced() {
        let mut table = table();
        assert_eq!(table.column("pred_tavg"), Some(&[Some(10.0), Some(10.5), None][..]));
        table.set_column("pred_tavg", vec![Some(1.0); 3]);
        assert_eq!(table.column_names().collect::<Vec<_>>(), vec!["real_tavg", "pred_tavg"]);
        assert_eq!(table.index()[&("0201D".to_string(), date(1))], 2);
    }

    #[test]
    fn retain_keeps_columns_aligned() {
        let mut table = table();
        table.retain_rows(|station, _| station == "0076");
        assert_eq!(table.len(), 2);
        assert_eq!(table.column("real_tavg"), Some(&[Some(9.5), None][..]));
    }

    #[tokio::test]
    async fn forecast_table_survives_disk() -> Result<(), DatasetError> {
        let tmp = tempfile::tempdir().map_err(|e| DatasetError::Io("tmp".into(), e))?;
        let path = tmp.path().join("one_step_forecast_2025.csv");
        let written = table();
        written.write_csv(&path).await?;
        let read = ForecastTable::read_csv(&path).await?;
        assert_eq!(read, written);
        Ok(())
    }
}
