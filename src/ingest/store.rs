use crate::ingest::error::IngestError;
use crate::types::station::Station;
use crate::utils::sanitize_name;
use chrono::{Datelike, NaiveDate};
use log::{error, info, warn};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

const STATION_DIR_PREFIX: &str = "Station_";
const BATCH_PREFIX: &str = "part_";
const MERGED_PREFIX: &str = "data_";

/// On-disk store for raw upstream batches.
///
/// Layout: `<root>/Station_{code}_{name}/{year}/part_{start}_{end}.json` for
/// fetched windows and `data_{year}.json` for the consolidated year. Every file
/// is written to a temporary sibling, synced, then renamed into place.
pub struct IngestionStore {
    root: PathBuf,
}

/// Outcome of [`IngestionStore::cleanup`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_year_dirs: usize,
    pub removed_station_dirs: usize,
}

impl IngestionStore {
    pub fn new(root: &Path) -> IngestionStore {
        IngestionStore {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn station_dir(&self, station: &Station) -> PathBuf {
        self.root.join(format!(
            "{}{}_{}",
            STATION_DIR_PREFIX,
            station.code,
            sanitize_name(&station.name)
        ))
    }

    pub fn year_dir(&self, station: &Station, year: i32) -> PathBuf {
        self.station_dir(station).join(year.to_string())
    }

    pub fn merged_path(&self, station: &Station, year: i32) -> PathBuf {
        self.year_dir(station, year)
            .join(format!("{MERGED_PREFIX}{year}.json"))
    }

    /// Persists one fetched window as an immutable batch file under the year
    /// of `window_start`. Re-appending the same window replaces its file.
    pub async fn append(
        &self,
        records: &[Value],
        window_start: NaiveDate,
        window_end: NaiveDate,
        station: &Station,
    ) -> Result<PathBuf, IngestError> {
        let folder = self.year_dir(station, window_start.year());
        fs::create_dir_all(&folder)
            .await
            .map_err(|e| IngestError::DirCreation(folder.clone(), e))?;

        let path = folder.join(format!(
            "{}{}_{}.json",
            BATCH_PREFIX,
            window_start.format("%Y%m%d"),
            window_end.format("%Y%m%d")
        ));
        let records = records.to_vec();
        let target = path.clone();
        task::spawn_blocking(move || {
            write_durable(&target, &records).map_err(|e| match e {
                DurableWriteError::Io(err) => IngestError::BatchWrite(target.clone(), err),
                DurableWriteError::Encode(err) => IngestError::Encode(target.clone(), err),
            })
        })
        .await??;

        info!(
            "Saved batch {} for station {}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or_default(),
            station.code
        );
        Ok(path)
    }

    /// Merges every batch file of a station-year into `data_{year}.json`.
    ///
    /// Records are deduplicated by date (later batches win), sorted, and merged
    /// with any previously consolidated file. Batch files are removed only after
    /// the merged file is durably in place; on failure they are left untouched.
    ///
    /// Returns the merged path, or `None` when there was nothing to merge.
    pub async fn consolidate(
        &self,
        year: i32,
        station: &Station,
    ) -> Result<Option<PathBuf>, IngestError> {
        let folder = self.year_dir(station, year);
        if fs::metadata(&folder).await.is_err() {
            return Ok(None);
        }

        let batches = list_files_with_prefix(&folder, BATCH_PREFIX).await?;
        if batches.is_empty() {
            return Ok(None);
        }
        info!(
            "Consolidating {} batch files for {} ({})",
            batches.len(),
            station.code,
            year
        );

        let merged_path = self.merged_path(station, year);
        let mut by_date: BTreeMap<String, Value> = BTreeMap::new();
        if fs::metadata(&merged_path).await.is_ok() {
            for record in read_records(&merged_path).await? {
                insert_by_date(&mut by_date, record);
            }
        }

        let mut processed = Vec::with_capacity(batches.len());
        for batch in batches {
            match read_records(&batch).await {
                Ok(records) => {
                    for record in records {
                        insert_by_date(&mut by_date, record);
                    }
                    processed.push(batch);
                }
                Err(e) => error!("Skipping unreadable batch {}: {}", batch.display(), e),
            }
        }

        if by_date.is_empty() {
            return Ok(None);
        }

        let merged: Vec<Value> = by_date.into_values().collect();
        let count = merged.len();
        let target = merged_path.clone();
        task::spawn_blocking(move || {
            write_durable(&target, &merged).map_err(|e| match e {
                DurableWriteError::Io(err) => IngestError::ConsolidatedWrite(target.clone(), err),
                DurableWriteError::Encode(err) => IngestError::Encode(target.clone(), err),
            })
        })
        .await??;
        info!("Consolidated {} ({} days)", merged_path.display(), count);

        for batch in processed {
            if let Err(e) = fs::remove_file(&batch).await {
                error!("Could not delete batch {}: {}", batch.display(), e);
            }
        }
        Ok(Some(merged_path))
    }

    /// Removes leading year directories that hold no JSON data.
    ///
    /// Years are visited in ascending order per station and removal stops at
    /// the first year containing data. A station directory left empty is removed.
    pub async fn cleanup(&self) -> Result<CleanupReport, IngestError> {
        let mut report = CleanupReport::default();
        if fs::metadata(&self.root).await.is_err() {
            return Ok(report);
        }

        for station_dir in list_station_dirs(&self.root).await? {
            let mut years: Vec<(i32, PathBuf)> = Vec::new();
            let mut entries = fs::read_dir(&station_dir)
                .await
                .map_err(|e| IngestError::DirRead(station_dir.clone(), e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| IngestError::DirRead(station_dir.clone(), e))?
            {
                let path = entry.path();
                let year = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.parse::<i32>().ok());
                if let (Some(year), true) = (year, path.is_dir()) {
                    years.push((year, path));
                }
            }
            years.sort_by_key(|(year, _)| *year);

            for (year, dir) in years {
                if dir_has_json(&dir).await? {
                    break;
                }
                fs::remove_dir_all(&dir)
                    .await
                    .map_err(|e| IngestError::Remove(dir.clone(), e))?;
                warn!("Removed empty year {} in {}", year, station_dir.display());
                report.removed_year_dirs += 1;
            }

            let mut remaining = fs::read_dir(&station_dir)
                .await
                .map_err(|e| IngestError::DirRead(station_dir.clone(), e))?;
            let is_empty = remaining
                .next_entry()
                .await
                .map_err(|e| IngestError::DirRead(station_dir.clone(), e))?
                .is_none();
            if is_empty {
                fs::remove_dir(&station_dir)
                    .await
                    .map_err(|e| IngestError::Remove(station_dir.clone(), e))?;
                report.removed_station_dirs += 1;
            }
        }
        Ok(report)
    }

    /// Reads every consolidated record across all stations and years.
    pub async fn load_records(&self) -> Result<Vec<Value>, IngestError> {
        let mut records = Vec::new();
        if fs::metadata(&self.root).await.is_err() {
            return Ok(records);
        }
        for station_dir in list_station_dirs(&self.root).await? {
            let mut years = Vec::new();
            let mut entries = fs::read_dir(&station_dir)
                .await
                .map_err(|e| IngestError::DirRead(station_dir.clone(), e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| IngestError::DirRead(station_dir.clone(), e))?
            {
                if entry.path().is_dir() {
                    years.push(entry.path());
                }
            }
            years.sort();
            for year_dir in years {
                for file in list_files_with_prefix(&year_dir, MERGED_PREFIX).await? {
                    records.extend(read_records(&file).await?);
                }
            }
        }
        info!("Loaded {} raw records from {}", records.len(), self.root.display());
        Ok(records)
    }
}

enum DurableWriteError {
    Io(std::io::Error),
    Encode(serde_json::Error),
}

/// Writes `records` to a temporary sibling, syncs it, then renames it over `path`.
fn write_durable(path: &Path, records: &[Value]) -> Result<(), DurableWriteError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(DurableWriteError::Io)?;
    serde_json::to_writer_pretty(&mut tmp, records).map_err(DurableWriteError::Encode)?;
    tmp.flush().map_err(DurableWriteError::Io)?;
    tmp.as_file().sync_all().map_err(DurableWriteError::Io)?;
    tmp.persist(path)
        .map_err(|e| DurableWriteError::Io(e.error))?;
    Ok(())
}

fn insert_by_date(by_date: &mut BTreeMap<String, Value>, record: Value) {
    match record.get("fecha").and_then(Value::as_str) {
        Some(date) => {
            by_date.insert(date.trim().to_string(), record);
        }
        None => warn!("Dropping raw record without a date during consolidation"),
    }
}

async fn read_records(path: &Path) -> Result<Vec<Value>, IngestError> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| IngestError::BatchRead(path.to_path_buf(), e))?;
    let content: Value = serde_json::from_slice(&bytes)
        .map_err(|e| IngestError::BatchDecode(path.to_path_buf(), e))?;
    match content {
        Value::Array(records) => Ok(records),
        _ => {
            warn!("Ignoring non-array JSON in {}", path.display());
            Ok(Vec::new())
        }
    }
}

async fn list_files_with_prefix(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>, IngestError> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| IngestError::DirRead(dir.to_path_buf(), e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IngestError::DirRead(dir.to_path_buf(), e))?
    {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(prefix) && name.ends_with(".json") {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

async fn list_station_dirs(root: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut dirs = Vec::new();
    let mut entries = fs::read_dir(root)
        .await
        .map_err(|e| IngestError::DirRead(root.to_path_buf(), e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IngestError::DirRead(root.to_path_buf(), e))?
    {
        let path = entry.path();
        if path.is_dir() && entry.file_name().to_string_lossy().starts_with(STATION_DIR_PREFIX) {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

async fn dir_has_json(dir: &Path) -> Result<bool, IngestError> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| IngestError::DirRead(dir.to_path_buf(), e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IngestError::DirRead(dir.to_path_buf(), e))?
    {
        if entry.path().extension().is_some_and(|ext| ext == "json") {
            return Ok(true);
        }
    }
    Ok(false)
}
