use crate::config::IngestionConfig;
use crate::sources::error::SourceError;
use crate::sources::{check_status, ObservationSource};
use crate::types::station::Station;
use chrono::NaiveDate;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Client for the AEMET daily climatological values endpoint.
///
/// Each request is two calls: the first returns an envelope with a temporary
/// `datos` URL, the second fetches the records from that URL.
pub struct AemetClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Envelope returned by the first call.
#[derive(Debug, Deserialize)]
struct Envelope {
    estado: u16,
    #[serde(default)]
    descripcion: Option<String>,
    #[serde(default)]
    datos: Option<String>,
}

impl AemetClient {
    /// # Errors
    ///
    /// Returns [`SourceError::MissingApiKey`] if no key is configured and
    /// [`SourceError::ClientBuild`] if the HTTP client cannot be created.
    pub fn new(config: &IngestionConfig) -> Result<Self, SourceError> {
        let api_key = config
            .aemet_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(SourceError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SourceError::ClientBuild)?;
        Ok(Self {
            client,
            base_url: config.aemet_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub(crate) fn metadata_url(&self, station: &Station, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/fechaini/{}/fechafin/{}/estacion/{}",
            self.base_url,
            start.format("%Y-%m-%dT00:00:00UTC"),
            end.format("%Y-%m-%dT23:59:59UTC"),
            station.code
        )
    }

    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .client
            .get(url)
            .header("api_key", &self.api_key)
            .header("cache-control", "no-cache")
            .send()
            .await
            .map_err(|e| SourceError::NetworkRequest(url.to_string(), e))?;
        let response = check_status(url, response)?;
        response
            .text()
            .await
            .map_err(|e| SourceError::NetworkRequest(url.to_string(), e))
    }
}

/// Interprets the first-call envelope, returning the `datos` URL.
fn resolve_envelope(url: &str, body: &str) -> Result<String, SourceError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| SourceError::JsonParse(url.to_string(), e))?;
    match envelope.estado {
        200 => envelope.datos.ok_or_else(|| SourceError::UnexpectedPayload {
            url: url.to_string(),
            message: "envelope has no datos url".to_string(),
        }),
        404 => Err(SourceError::NoData(url.to_string())),
        429 => Err(SourceError::RateLimited(url.to_string())),
        other => Err(SourceError::UnexpectedPayload {
            url: url.to_string(),
            message: format!(
                "estado {}: {}",
                other,
                envelope.descripcion.unwrap_or_default()
            ),
        }),
    }
}

fn parse_records(url: &str, body: &str) -> Result<Vec<Value>, SourceError> {
    match serde_json::from_str::<Value>(body).map_err(|e| SourceError::JsonParse(url.to_string(), e))? {
        Value::Array(records) => Ok(records),
        _ => Err(SourceError::UnexpectedPayload {
            url: url.to_string(),
            message: "expected a JSON array of records".to_string(),
        }),
    }
}

impl ObservationSource for AemetClient {
    async fn fetch_window(
        &self,
        station: &Station,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Value>, SourceError> {
        let url = self.metadata_url(station, start, end);
        debug!("Requesting {}", url);
        let body = self.get_text(&url).await?;
        let data_url = resolve_envelope(&url, &body)?;

        let body = self.get_text(&data_url).await?;
        let records = parse_records(&data_url, &body)?;
        info!(
            "Fetched {} records for {} ({} to {})",
            records.len(),
            station.code,
            start,
            end
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_metadata_url() -> Result<(), SourceError> {
        let config = IngestionConfig::builder()
            .aemet_api_key("key".to_string())
            .aemet_url("https://example.test/diarios/datos/")
            .build();
        let client = AemetClient::new(&config)?;
        let url = client.metadata_url(
            &Station::new("0076", "Barcelona", 41.3, 2.07),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        );
        assert_eq!(
            url,
            "https://example.test/diarios/datos/fechaini/2024-01-01T00:00:00UTC/fechafin/2024-06-30T23:59:59UTC/estacion/0076"
        );
        Ok(())
    }

    #[test]
    fn requires_api_key() {
        let config = IngestionConfig::builder().build();
        assert!(matches!(AemetClient::new(&config), Err(SourceError::MissingApiKey)));
    }

    #[test]
    fn envelope_states() {
        let ok = r#"{"descripcion":"exito","estado":200,"datos":"https://example.test/tmp/abc"}"#;
        assert_eq!(resolve_envelope("u", ok).unwrap(), "https://example.test/tmp/abc");

        let missing = r#"{"descripcion":"No hay datos","estado":404}"#;
        assert!(matches!(resolve_envelope("u", missing), Err(SourceError::NoData(_))));

        let limited = r#"{"descripcion":"Limite de peticiones","estado":429}"#;
        let err = resolve_envelope("u", limited).unwrap_err();
        assert!(err.is_rate_limit());
    }

    #[test]
    fn records_must_be_an_array() {
        let records = parse_records("u", r#"[{"fecha":"2024-01-01"}]"#).unwrap();
        assert_eq!(records.len(), 1);
        assert!(parse_records("u", r#"{"fecha":"2024-01-01"}"#).is_err());
    }
}
