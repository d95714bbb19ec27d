//! Upstream data sources: the primary observation archive and the secondary
//! physics reanalysis, each behind a small trait so ingestion and fusion can
//! run against in-memory sources in tests.

pub mod aemet;
pub mod error;
pub mod open_meteo;
pub mod physics_cache;
pub mod retry;

use crate::sources::error::SourceError;
use crate::types::record::PhysicsDay;
use crate::types::station::Station;
use chrono::NaiveDate;
use log::warn;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::future::Future;

/// Source of raw daily observation records for one station.
pub trait ObservationSource {
    /// Fetches raw records for `station` between `start` and `end` (inclusive).
    fn fetch_window(
        &self,
        station: &Station,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Value>, SourceError>> + Send;
}

/// Source of daily physically-derived variables for a station's coordinates.
pub trait PhysicsSource {
    /// Fetches daily sunshine, precipitation, pressure and cloud cover between
    /// `start` and `end` (inclusive). Must not query days after today.
    fn fetch_daily(
        &self,
        station: &Station,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Vec<PhysicsDay>, SourceError>> + Send;
}

/// Maps non-success HTTP statuses onto [`SourceError`], treating 429 as a
/// rate limit.
pub(crate) fn check_status(url: &str, response: Response) -> Result<Response, SourceError> {
    if response.status() == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited(url.to_string()));
    }
    match response.error_for_status() {
        Ok(resp) => Ok(resp),
        Err(e) => {
            warn!("HTTP error for {}: {:?}", url, e);
            Err(match e.status() {
                Some(StatusCode::NOT_FOUND) => SourceError::NoData(url.to_string()),
                Some(status) => SourceError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                },
                None => SourceError::NetworkRequest(url.to_string(), e),
            })
        }
    }
}
