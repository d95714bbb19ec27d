use crate::config::{CalendarConfig, IngestionConfig};
use crate::ingest::error::IngestError;
use crate::ingest::store::{CleanupReport, IngestionStore};
use crate::sources::retry::RetryPolicy;
use crate::sources::ObservationSource;
use crate::types::station::{Station, StationRegistry};
use chrono::{Datelike, Duration, Months, NaiveDate};
use log::{info, warn};
use std::time::Duration as StdDuration;

/// Summary of one ingestion run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestionSummary {
    pub windows_requested: usize,
    pub windows_with_data: usize,
    pub records_saved: usize,
    pub years_consolidated: usize,
    pub cleanup: CleanupReport,
}

/// Splits `[start, end]` into consecutive windows of `months` months.
pub fn fetch_windows(start: NaiveDate, end: NaiveDate, months: u32) -> Vec<(NaiveDate, NaiveDate)> {
    let mut windows = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let next = cursor
            .checked_add_months(Months::new(months.max(1)))
            .unwrap_or(NaiveDate::MAX);
        let window_end = (next - Duration::days(1)).min(end);
        windows.push((cursor, window_end));
        if next == NaiveDate::MAX {
            break;
        }
        cursor = next;
    }
    windows
}

/// Walks every station through the calendar window by window, persisting each
/// fetched batch and consolidating each finished year.
pub struct IngestionRunner<'a, S> {
    source: S,
    store: &'a IngestionStore,
    retry: RetryPolicy,
    window_months: u32,
    request_delay: StdDuration,
}

impl<'a, S: ObservationSource> IngestionRunner<'a, S> {
    pub fn new(source: S, store: &'a IngestionStore, config: &IngestionConfig) -> Self {
        Self {
            source,
            store,
            retry: RetryPolicy::from(&config.retry),
            window_months: config.window_months,
            request_delay: StdDuration::from_millis(config.request_delay_ms),
        }
    }

    pub async fn run(
        &self,
        registry: &StationRegistry,
        calendar: &CalendarConfig,
    ) -> Result<IngestionSummary, IngestError> {
        let mut summary = IngestionSummary::default();
        for station in registry.iter() {
            info!("Ingesting station {} ({})", station.code, station.name);
            self.ingest_station(station, calendar, &mut summary).await?;
        }
        summary.cleanup = self.store.cleanup().await?;
        info!(
            "Ingestion finished: {}/{} windows with data, {} records, {} years consolidated",
            summary.windows_with_data,
            summary.windows_requested,
            summary.records_saved,
            summary.years_consolidated
        );
        Ok(summary)
    }

    async fn ingest_station(
        &self,
        station: &Station,
        calendar: &CalendarConfig,
        summary: &mut IngestionSummary,
    ) -> Result<(), IngestError> {
        let mut current_year: Option<i32> = None;
        for (start, end) in fetch_windows(calendar.global_start, calendar.global_end, self.window_months) {
            if let Some(year) = current_year.filter(|y| *y != start.year()) {
                self.consolidate(year, station, summary).await;
            }
            current_year = Some(start.year());

            summary.windows_requested += 1;
            let label = format!("{} {}..{}", station.code, start, end);
            let records = self
                .retry
                .run(&label, || self.source.fetch_window(station, start, end))
                .await;
            if records.is_empty() {
                warn!("No data for {}; leaving a gap", label);
            } else {
                match self.store.append(&records, start, end, station).await {
                    Ok(_) => {
                        summary.windows_with_data += 1;
                        summary.records_saved += records.len();
                    }
                    Err(e) => warn!("Could not save {}, leaving a gap: {}", label, e),
                }
            }

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }
        if let Some(year) = current_year {
            self.consolidate(year, station, summary).await;
        }
        Ok(())
    }

    /// A failed consolidation leaves its batches for the next run.
    async fn consolidate(&self, year: i32, station: &Station, summary: &mut IngestionSummary) {
        match self.store.consolidate(year, station).await {
            Ok(Some(_)) => summary.years_consolidated += 1,
            Ok(None) => {}
            Err(e) => warn!(
                "Consolidation of {} ({}) failed, batches kept: {}",
                station.code, year, e
            ),
        }
    }
}
