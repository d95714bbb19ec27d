//! On-disk tabular artifacts shared between pipeline stages: the canonical
//! clean dataset and the forecast tables.

pub mod clean;
pub mod error;
pub mod forecast_table;

use crate::dataset::error::DatasetError;
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::task;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Writes `df` as a headed CSV, creating parent directories as needed.
async fn write_frame(mut df: DataFrame, path: &Path) -> Result<(), DatasetError> {
    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        if let Some(parent) = path_buf.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatasetError::Io(parent.to_path_buf(), e))?;
        }
        let mut file =
            std::fs::File::create(&path_buf).map_err(|e| DatasetError::Io(path_buf.clone(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| DatasetError::CsvWrite(path_buf.clone(), e))?;
        info!("Wrote {} rows to {}", df.height(), path_buf.display());
        Ok::<(), DatasetError>(())
    })
    .await?
}

/// Reads a headed CSV with every column kept as text, so identifiers such as
/// `0076` keep their leading zeros. Numeric columns are cast by the caller.
async fn read_text_frame(path: &Path) -> Result<DataFrame, DatasetError> {
    if tokio::fs::metadata(path).await.is_err() {
        return Err(DatasetError::Missing(path.to_path_buf()));
    }
    let path_buf: PathBuf = path.to_path_buf();
    task::spawn_blocking(move || {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path_buf.clone()))
            .map_err(|e| DatasetError::CsvRead(path_buf.clone(), e))?
            .finish()
            .map_err(|e| DatasetError::CsvRead(path_buf, e))
    })
    .await?
}

fn required<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, DatasetError> {
    df.column(name)
        .map_err(|_| DatasetError::MissingColumn(name.to_string()))
}

fn text_values(column: &Column) -> Result<Vec<Option<String>>, DatasetError> {
    let cast = column.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string).filter(|s| !s.is_empty()))
        .collect())
}

fn float_values(column: &Column) -> Result<Vec<Option<f64>>, DatasetError> {
    let cast = column.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

fn parse_flag(raw: Option<&str>, column: &str, row: usize) -> Result<bool, DatasetError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(false),
        Some(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Some(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        Some(s) => s
            .parse::<f64>()
            .map(|v| v != 0.0)
            .map_err(|_| DatasetError::InvalidValue {
                column: column.to_string(),
                row,
                value: s.to_string(),
            }),
    }
}

fn parse_date(raw: Option<&str>, column: &str, row: usize) -> Result<chrono::NaiveDate, DatasetError> {
    let raw = raw.unwrap_or_default();
    chrono::NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|_| DatasetError::InvalidValue {
        column: column.to_string(),
        row,
        value: raw.to_string(),
    })
}
