use crate::config::{CalendarConfig, FusionConfig, PipelineConfig};
use crate::fusion::audit::{apply_physical_clamps, DroppedStation, ImputationAudit};
use crate::fusion::error::FusionError;
use crate::fusion::impute::{fill_forward_backward, impute_column};
use crate::sources::retry::RetryPolicy;
use crate::sources::PhysicsSource;
use crate::types::record::{PhysicsDay, WeatherRecord};
use crate::types::series::{calendar, CanonicalSeries};
use crate::types::station::{StationMeta, StationRegistry};
use crate::types::variable::Variable;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

/// Result of fusing every retained station.
#[derive(Debug, Clone)]
pub struct FusionOutput {
    pub series: Vec<CanonicalSeries>,
    pub audit: ImputationAudit,
}

/// Groups records by station and drops stations whose raw coverage of the
/// calendar is below `min_coverage`.
pub fn coverage_filter(
    records: Vec<WeatherRecord>,
    calendar: &CalendarConfig,
    min_coverage: f64,
) -> (BTreeMap<String, Vec<WeatherRecord>>, Vec<DroppedStation>) {
    let total_days = calendar.total_days();
    let mut grouped: BTreeMap<String, Vec<WeatherRecord>> = BTreeMap::new();
    for record in records {
        grouped.entry(record.station.clone()).or_default().push(record);
    }

    let mut kept = BTreeMap::new();
    let mut dropped = Vec::new();
    for (code, station_records) in grouped {
        let observed: BTreeSet<NaiveDate> = station_records
            .iter()
            .map(|r| r.date)
            .filter(|d| *d >= calendar.global_start && *d <= calendar.global_end)
            .collect();
        let coverage = if total_days == 0 {
            0.0
        } else {
            observed.len() as f64 / total_days as f64
        };
        if coverage < min_coverage {
            warn!(
                "Dropping station {}: {:.1}% coverage is below {:.1}%",
                code,
                coverage * 100.0,
                min_coverage * 100.0
            );
            dropped.push(DroppedStation { code, coverage });
        } else {
            kept.insert(code, station_records);
        }
    }
    (kept, dropped)
}

/// Builds the canonical series of one station from its raw records and the
/// secondary physics series.
///
/// Every day of the calendar gets a row. Sunshine, pressure and cloud cover come
/// from `physics`; precipitation prefers the primary record and falls back to
/// `physics`. Continuous variables are then imputed tier by tier and wind
/// direction is carried forward and backward.
pub fn fuse_station(
    code: &str,
    records: &[WeatherRecord],
    physics: &[PhysicsDay],
    calendar_config: &CalendarConfig,
    fusion: &FusionConfig,
) -> CanonicalSeries {
    let start = calendar_config.global_start;
    let end = calendar_config.global_end;
    let dates = calendar(start, end);
    let n = dates.len();
    let row_of = |date: NaiveDate| -> Option<usize> {
        (date >= start && date <= end).then(|| (date - start).num_days() as usize)
    };

    let mut by_date: BTreeMap<NaiveDate, &WeatherRecord> = BTreeMap::new();
    for record in records {
        by_date.entry(record.date).or_insert(record);
    }

    let meta = StationMeta {
        code: code.to_string(),
        name: by_date.values().find_map(|r| r.name.clone()),
        province: by_date.values().find_map(|r| r.province.clone()),
        altitude: by_date.values().find_map(|r| r.altitude),
    };

    let mut values: BTreeMap<Variable, Vec<f64>> = Variable::ALL
        .iter()
        .map(|v| (*v, vec![f64::NAN; n]))
        .collect();
    for (date, record) in &by_date {
        let Some(row) = row_of(*date) else { continue };
        for variable in Variable::ALL {
            if Variable::PHYSICS.contains(&variable) {
                continue;
            }
            if let (Some(value), Some(column)) = (record.values.get(variable), values.get_mut(&variable)) {
                column[row] = value;
            }
        }
    }

    let mut secondary_prcp = vec![f64::NAN; n];
    for day in physics {
        let Some(row) = row_of(day.date) else { continue };
        for variable in Variable::PHYSICS {
            if let (Some(value), Some(column)) = (day.get(variable), values.get_mut(&variable)) {
                column[row] = match variable {
                    Variable::Tsun => value.max(0.0),
                    Variable::Cldc => value.clamp(0.0, 100.0),
                    _ => value,
                };
            }
        }
        if let Some(p) = day.precipitation {
            secondary_prcp[row] = p.max(0.0);
        }
    }

    let mut estimated: BTreeMap<Variable, Vec<bool>> = BTreeMap::new();

    if let Some(prcp) = values.get_mut(&Variable::Prcp) {
        // A primary gap stays flagged even when the secondary source covers it.
        estimated.insert(Variable::Prcp, prcp.iter().map(|v| v.is_nan()).collect());
        for (value, fallback) in prcp.iter_mut().zip(&secondary_prcp) {
            if value.is_nan() {
                *value = if fallback.is_nan() { 0.0 } else { *fallback };
            }
        }
    }

    for variable in Variable::CONTINUOUS {
        let Some(column) = values.get_mut(&variable) else { continue };
        estimated.insert(variable, column.iter().map(|v| v.is_nan()).collect());
        let counts = impute_column(&dates, column, fusion.max_interpolation_gap, variable.default_fill());
        if counts.total() > 0 {
            debug!(
                "{} {}: {} interpolated, {} by day-of-year, {} by month, {} by default",
                code, variable, counts.interpolated, counts.day_of_year, counts.month, counts.default
            );
        }
    }

    if let Some(wdir) = values.get_mut(&Variable::Wdir) {
        for value in wdir.iter_mut() {
            if !(0.0..=360.0).contains(value) {
                *value = f64::NAN;
            }
        }
        estimated.insert(Variable::Wdir, wdir.iter().map(|v| v.is_nan()).collect());
        fill_forward_backward(wdir, 0.0);
    }

    CanonicalSeries::from_columns(meta, dates, values, estimated)
}

/// Fuses validated records into one dense, fully imputed series per station.
pub struct WeatherProcessor<'a, P> {
    calendar: &'a CalendarConfig,
    fusion: &'a FusionConfig,
    registry: StationRegistry,
    physics: P,
    retry: RetryPolicy,
}

impl<'a, P: PhysicsSource> WeatherProcessor<'a, P> {
    pub fn new(config: &'a PipelineConfig, physics: P) -> Self {
        Self {
            calendar: &config.calendar,
            fusion: &config.fusion,
            registry: config.registry(),
            physics,
            retry: RetryPolicy::from(&config.ingestion.retry),
        }
    }

    /// Applies the coverage gate, fuses every retained station and audits the
    /// result.
    ///
    /// # Errors
    ///
    /// [`FusionError::NoRecords`] for empty input and
    /// [`FusionError::NoStationsRetained`] if the coverage gate drops everything.
    pub async fn process(&self, records: Vec<WeatherRecord>) -> Result<FusionOutput, FusionError> {
        if records.is_empty() {
            return Err(FusionError::NoRecords);
        }
        let (kept, dropped) = coverage_filter(records, self.calendar, self.fusion.min_coverage);
        if kept.is_empty() {
            return Err(FusionError::NoStationsRetained {
                total: dropped.len(),
                min_coverage: self.fusion.min_coverage,
            });
        }
        info!(
            "Fusing {} stations ({} dropped by coverage)",
            kept.len(),
            dropped.len()
        );

        let mut series = Vec::with_capacity(kept.len());
        for (i, (code, station_records)) in kept.iter().enumerate() {
            info!("Processing [{}/{}] {}", i + 1, kept.len(), code);
            let physics = self.fetch_physics(code).await;
            let mut fused = fuse_station(code, station_records, &physics, self.calendar, self.fusion);
            apply_physical_clamps(&mut fused);
            series.push(fused);
        }

        let audit = ImputationAudit::from_series(&series, dropped);
        audit.log();
        Ok(FusionOutput { series, audit })
    }

    /// An unavailable secondary source yields no rows; the affected columns
    /// then fall through to imputation.
    async fn fetch_physics(&self, code: &str) -> Vec<PhysicsDay> {
        let Some(station) = self.registry.get(code) else {
            warn!("No coordinates for station {}; physics variables will be imputed", code);
            return Vec::new();
        };
        let label = format!("physics {}", code);
        let days = self
            .retry
            .run(&label, || {
                self.physics
                    .fetch_daily(station, self.calendar.global_start, self.calendar.global_end)
            })
            .await;
        if days.is_empty() {
            warn!("Secondary source returned nothing for {}", code);
        }
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::sources::error::SourceError;
    use crate::types::record::Observations;
    use crate::types::station::Station;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn calendar_config() -> CalendarConfig {
        CalendarConfig::builder()
            .global_start(date(1))
            .global_end(date(10))
            .build()
    }

    fn record(code: &str, day: u32, tavg: Option<f64>, prcp: Option<f64>) -> WeatherRecord {
        WeatherRecord {
            date: date(day),
            station: code.to_string(),
            name: (day == 5).then(|| "Barcelona - Aeropuerto".to_string()),
            province: None,
            altitude: Some(4.0),
            values: Observations {
                tavg,
                prcp,
                wdir: (day == 2).then_some(180.0),
                ..Default::default()
            },
        }
    }

    fn full_station(code: &str) -> Vec<WeatherRecord> {
        (1..=10)
            .filter(|d| *d != 3 && *d != 4)
            .map(|d| record(code, d, Some(d as f64), Some(0.0)))
            .chain([record(code, 3, None, None), record(code, 4, None, None)])
            .collect()
    }

    #[test]
    fn fused_series_is_dense_and_flagged() {
        let mut records = full_station("0076");
        records.push(record("0076", 6, Some(99.0), Some(7.0)));
        records.iter_mut().filter(|r| r.date == date(2)).for_each(|r| r.values.prcp = None);
        let physics = vec![PhysicsDay {
            date: date(2),
            sunshine_hours: Some(-1.0),
            precipitation: Some(1.5),
            pressure: Some(1020.0),
            cloud_cover: Some(130.0),
        }];

        let series = fuse_station("0076", &records, &physics, &calendar_config(), &FusionConfig::default());

        assert_eq!(series.len(), 10);
        assert_eq!(series.dates().first(), Some(&date(1)));
        assert_eq!(series.dates().last(), Some(&date(10)));
        assert_eq!(series.meta.name.as_deref(), Some("Barcelona - Aeropuerto"));

        let tavg = series.values(Variable::Tavg);
        assert_eq!(&tavg[..6], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(&series.estimated(Variable::Tavg)[..5], &[false, false, true, true, false]);

        assert_eq!(series.values(Variable::Prcp)[1], 1.5);
        assert!(series.estimated(Variable::Prcp)[1]);
        assert_eq!(series.values(Variable::Prcp)[2], 0.0);
        assert!(!series.estimated(Variable::Prcp)[0]);

        assert_eq!(series.values(Variable::Tsun)[1], 0.0);
        assert!(!series.estimated(Variable::Tsun)[1]);
        assert!(series.estimated(Variable::Tsun)[0]);
        assert_eq!(series.values(Variable::Cldc)[1], 100.0);
        assert_eq!(series.values(Variable::Pres), &[1020.0; 10]);

        assert_eq!(series.values(Variable::Wdir), &[180.0; 10]);
        assert_eq!(series.estimated(Variable::Wdir).iter().filter(|f| **f).count(), 9);
    }

    #[test]
    fn sparse_station_is_dropped() {
        let mut records = full_station("0076");
        records.extend((1..=5).map(|d| record("0201D", d, Some(1.0), None)));
        let (kept, dropped) = coverage_filter(records, &calendar_config(), 0.85);
        assert_eq!(kept.keys().collect::<Vec<_>>(), vec!["0076"]);
        assert_eq!(dropped, vec![DroppedStation { code: "0201D".into(), coverage: 0.5 }]);
    }

    struct NoPhysics;

    impl PhysicsSource for NoPhysics {
        async fn fetch_daily(
            &self,
            _station: &Station,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<PhysicsDay>, SourceError> {
            Err(SourceError::NoData("offline".into()))
        }
    }

    #[tokio::test]
    async fn processing_is_deterministic() -> Result<(), FusionError> {
        let config = PipelineConfig::builder()
            .calendar(calendar_config())
            .stations(vec![Station::new("0076", "Barcelona", 41.29, 2.07)])
            .ingestion(
                crate::config::IngestionConfig::builder()
                    .retry(RetryConfig::builder().base_delay_ms(0).build())
                    .build(),
            )
            .build();
        let processor = WeatherProcessor::new(&config, NoPhysics);

        let first = processor.process(full_station("0076")).await?;
        let second = processor.process(full_station("0076")).await?;
        assert_eq!(first.series, second.series);
        assert_eq!(first.series.len(), 1);
        assert_eq!(first.series[0].values(Variable::Pres), &[1013.0; 10]);
        assert_eq!(first.audit.estimated_pct[&Variable::Pres], 100.0);

        let empty = processor.process(Vec::new()).await;
        assert!(matches!(empty, Err(FusionError::NoRecords)));
        Ok(())
    }
}
