use crate::sources::error::SourceError;
use crate::sources::PhysicsSource;
use crate::types::record::PhysicsDay;
use crate::types::station::Station;
use chrono::{NaiveDate, Utc};
use log::{info, warn};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::{fs, task};

/// Wraps a [`PhysicsSource`] with a parquet file cache, one file per station
/// and window. Windows reaching today or later are never cached, since the
/// upstream may still revise them.
pub struct CachedPhysicsSource<S> {
    inner: S,
    cache_dir: PathBuf,
}

impl<S: PhysicsSource + Sync> CachedPhysicsSource<S> {
    pub fn new(inner: S, cache_dir: &Path) -> Self {
        Self {
            inner,
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    fn cache_path(&self, station: &Station, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.cache_dir.join(format!(
            "physics-{}-{}-{}.parquet",
            station.code,
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        ))
    }

    async fn cache_frame(days: &[PhysicsDay], path: &Path) -> Result<(), SourceError> {
        let mut df = physics_to_frame(days)
            .map_err(|e| SourceError::ParquetWritePolars(path.to_path_buf(), e))?;
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let file = std::fs::File::create(&path_buf)
                .map_err(|e| SourceError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| SourceError::ParquetWritePolars(path_buf, e))?;
            Ok::<(), SourceError>(())
        })
        .await??;
        Ok(())
    }

    async fn read_cached(path: &Path) -> Result<Vec<PhysicsDay>, SourceError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let df = LazyFrame::scan_parquet(&path_buf, Default::default())
                .and_then(|lf| lf.collect())
                .map_err(|e| SourceError::ParquetRead(path_buf.clone(), e))?;
            frame_to_physics(&df).map_err(|message| SourceError::CacheCorrupt {
                path: path_buf,
                message,
            })
        })
        .await?
    }
}

impl<S: PhysicsSource + Sync> PhysicsSource for CachedPhysicsSource<S> {
    async fn fetch_daily(
        &self,
        station: &Station,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PhysicsDay>, SourceError> {
        let path = self.cache_path(station, start, end);
        if fs::metadata(&path).await.is_ok() {
            info!("Cache hit for physics data of {} at {:?}", station.code, path);
            match Self::read_cached(&path).await {
                Ok(days) => return Ok(days),
                Err(e) => warn!("Ignoring unreadable cache {:?}: {}", path, e),
            }
        } else {
            warn!(
                "Cache miss for physics data of {}. Downloading.",
                station.code
            );
        }

        let days = self.inner.fetch_daily(station, start, end).await?;
        if !days.is_empty() && end < Utc::now().date_naive() {
            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| SourceError::CacheDirCreation(self.cache_dir.clone(), e))?;
            Self::cache_frame(&days, &path).await?;
            info!("Cached physics data for {} to {:?}", station.code, path);
        }
        Ok(days)
    }
}

pub(crate) fn physics_to_frame(days: &[PhysicsDay]) -> PolarsResult<DataFrame> {
    let dates: Vec<String> = days.iter().map(|d| d.date.format("%Y-%m-%d").to_string()).collect();
    let sunshine: Vec<Option<f64>> = days.iter().map(|d| d.sunshine_hours).collect();
    let precipitation: Vec<Option<f64>> = days.iter().map(|d| d.precipitation).collect();
    let pressure: Vec<Option<f64>> = days.iter().map(|d| d.pressure).collect();
    let cloud_cover: Vec<Option<f64>> = days.iter().map(|d| d.cloud_cover).collect();
    DataFrame::new(vec![
        Column::new("date".into(), dates),
        Column::new("tsun".into(), sunshine),
        Column::new("prcp".into(), precipitation),
        Column::new("pres".into(), pressure),
        Column::new("cldc".into(), cloud_cover),
    ])
}

pub(crate) fn frame_to_physics(df: &DataFrame) -> Result<Vec<PhysicsDay>, String> {
    let column = |name: &str| df.column(name).map_err(|e| format!("column '{name}': {e}"));
    let floats = |name: &str| -> Result<Vec<Option<f64>>, String> {
        let cast = column(name)?
            .cast(&DataType::Float64)
            .map_err(|e| format!("column '{name}': {e}"))?;
        let values = cast
            .f64()
            .map_err(|e| format!("column '{name}': {e}"))?
            .into_iter()
            .collect();
        Ok(values)
    };

    let dates = column("date")?
        .str()
        .map_err(|e| format!("column 'date': {e}"))?
        .into_iter()
        .map(|d| d.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
        .collect::<Vec<_>>();
    let sunshine = floats("tsun")?;
    let precipitation = floats("prcp")?;
    let pressure = floats("pres")?;
    let cloud_cover = floats("cldc")?;

    dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            let date = date.ok_or_else(|| format!("row {i} has no valid date"))?;
            Ok(PhysicsDay {
                date,
                sunshine_hours: sunshine[i],
                precipitation: precipitation[i],
                pressure: pressure[i],
                cloud_cover: cloud_cover[i],
            })
        })
        .collect()
}
