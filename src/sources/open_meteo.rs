use crate::config::IngestionConfig;
use crate::sources::error::SourceError;
use crate::sources::{check_status, PhysicsSource};
use crate::types::record::PhysicsDay;
use crate::types::station::Station;
use chrono::{NaiveDate, Utc};
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DAILY_VARIABLES: &str = "sunshine_duration,precipitation_sum,pressure_msl_mean,cloud_cover_mean";
const LIMIT_MESSAGE: &str = "limit exceeded";

/// Client for the Open-Meteo historical archive.
pub struct OpenMeteoClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    daily: Option<DailyBlock>,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    #[serde(default)]
    sunshine_duration: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
    #[serde(default)]
    pressure_msl_mean: Vec<Option<f64>>,
    #[serde(default)]
    cloud_cover_mean: Vec<Option<f64>>,
}

impl OpenMeteoClient {
    pub fn new(config: &IngestionConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SourceError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: config.open_meteo_url.clone(),
        })
    }
}

/// Clamps a request window so it never extends past `today`. Returns `None`
/// when the whole window lies in the future.
pub fn clamp_window(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    if start > today || start > end {
        return None;
    }
    Some((start, end.min(today)))
}

fn column_value(column: &[Option<f64>], idx: usize) -> Option<f64> {
    column.get(idx).copied().flatten().filter(|v| v.is_finite())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Converts an archive JSON body into physics days, converting sunshine from
/// seconds to hours and clipping physically impossible values.
fn parse_archive(url: &str, body: &str) -> Result<Vec<PhysicsDay>, SourceError> {
    if body.to_lowercase().contains(LIMIT_MESSAGE) {
        return Err(SourceError::RateLimited(url.to_string()));
    }
    let response: ArchiveResponse =
        serde_json::from_str(body).map_err(|e| SourceError::JsonParse(url.to_string(), e))?;
    if response.error {
        return Err(SourceError::UnexpectedPayload {
            url: url.to_string(),
            message: response.reason.unwrap_or_default(),
        });
    }
    let Some(daily) = response.daily else {
        return Ok(Vec::new());
    };

    let mut days = Vec::with_capacity(daily.time.len());
    for (idx, time) in daily.time.iter().enumerate() {
        let Ok(date) = NaiveDate::parse_from_str(time, "%Y-%m-%d") else {
            warn!("Skipping physics row with unparseable date '{}'", time);
            continue;
        };
        days.push(PhysicsDay {
            date,
            sunshine_hours: column_value(&daily.sunshine_duration, idx)
                .map(|secs| round2(secs / 3600.0).max(0.0)),
            precipitation: column_value(&daily.precipitation_sum, idx).map(|p| p.max(0.0)),
            pressure: column_value(&daily.pressure_msl_mean, idx),
            cloud_cover: column_value(&daily.cloud_cover_mean, idx).map(|c| c.clamp(0.0, 100.0)),
        });
    }
    Ok(days)
}

impl PhysicsSource for OpenMeteoClient {
    async fn fetch_daily(
        &self,
        station: &Station,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PhysicsDay>, SourceError> {
        let today = Utc::now().date_naive();
        let Some((start, end)) = clamp_window(start, end, today) else {
            info!("Skipping physics request for {}: window starts in the future", station.code);
            return Ok(Vec::new());
        };

        let query = [
            ("latitude", station.latitude.to_string()),
            ("longitude", station.longitude.to_string()),
            ("start_date", start.format("%Y-%m-%d").to_string()),
            ("end_date", end.format("%Y-%m-%d").to_string()),
            ("daily", DAILY_VARIABLES.to_string()),
            ("timezone", "auto".to_string()),
        ];
        let url = format!("{}?station={}", self.base_url, station.code);
        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| SourceError::NetworkRequest(url.clone(), e))?;
        let response = check_status(&url, response)?;
        let body = response
            .text()
            .await
            .map_err(|e| SourceError::NetworkRequest(url.clone(), e))?;

        let days = parse_archive(&url, &body)?;
        info!(
            "Fetched {} physics days for {} ({} to {})",
            days.len(),
            station.code,
            start,
            end
        );
        Ok(days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_is_clamped_to_today() {
        let today = date(2025, 6, 15);
        assert_eq!(
            clamp_window(date(2025, 1, 1), date(2025, 12, 31), today),
            Some((date(2025, 1, 1), today))
        );
        assert_eq!(clamp_window(date(2025, 7, 1), date(2025, 12, 31), today), None);
        assert_eq!(
            clamp_window(date(2024, 1, 1), date(2024, 6, 30), today),
            Some((date(2024, 1, 1), date(2024, 6, 30)))
        );
    }

    #[test]
    fn parses_and_clips_archive_rows() -> Result<(), SourceError> {
        let body = r#"{
            "latitude": 41.29, "longitude": 2.07,
            "daily": {
                "time": ["2024-01-01", "2024-01-02", "bad"],
                "sunshine_duration": [27000.0, null, 1.0],
                "precipitation_sum": [-0.1, 3.2, 0.0],
                "pressure_msl_mean": [1021.4, 1015.0, 1000.0],
                "cloud_cover_mean": [104.0, 55.0, 0.0]
            }
        }"#;
        let days = parse_archive("u", body)?;
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].sunshine_hours, Some(7.5));
        assert_eq!(days[0].precipitation, Some(0.0));
        assert_eq!(days[0].cloud_cover, Some(100.0));
        assert_eq!(days[1].sunshine_hours, None);
        assert_eq!(days[1].pressure, Some(1015.0));
        Ok(())
    }

    #[test]
    fn limit_message_is_a_rate_limit() {
        let body = r#"{"error": true, "reason": "Daily API request limit exceeded. Please try again tomorrow."}"#;
        assert!(parse_archive("u", body).unwrap_err().is_rate_limit());
    }
}
