//! Turns raw upstream observation records into typed [`WeatherRecord`]s.
//!
//! The upstream source reports numbers as strings with a decimal comma
//! (`"10,5"`), uses `"Ip"` for trace precipitation, and encodes wind direction
//! in tens of degrees with `99` for variable and `88` for no data. Values that
//! cannot be parsed become `None`; only a missing or unparseable date (or
//! station code) rejects the whole record.

use crate::ingest::error::ValidationError;
use crate::types::record::{Observations, WeatherRecord};
use chrono::NaiveDate;
use log::{debug, warn};
use serde_json::Value;

const TRACE_TOKEN: &str = "ip";
const VARIABLE_WIND_CODE: f64 = 99.0;
const MISSING_WIND_CODE: f64 = 88.0;

/// Parses a locale-formatted number. Unparseable input is `None`, never an error.
///
/// # Examples
///
/// ```
/// use rainbow_forecast::parse_locale_number;
/// use serde_json::json;
///
/// assert_eq!(parse_locale_number(&json!("10,5")), Some(10.5));
/// assert_eq!(parse_locale_number(&json!(3)), Some(3.0));
/// assert_eq!(parse_locale_number(&json!("not-a-number")), None);
/// ```
pub fn parse_locale_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned = s.trim().replace(',', ".");
            if cleaned.is_empty() {
                None
            } else {
                cleaned.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Like [`parse_locale_number`], additionally mapping the trace token to `0.0`.
pub fn parse_precipitation(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) if s.trim().eq_ignore_ascii_case(TRACE_TOKEN) => Some(0.0),
        other => parse_locale_number(other),
    }
}

/// Converts an upstream wind direction code (tens of degrees) into degrees,
/// keeping the variable-direction sentinel and dropping the no-data code.
fn parse_wind_direction(value: &Value) -> Option<f64> {
    let code = parse_locale_number(value)?;
    if code == VARIABLE_WIND_CODE {
        Some(VARIABLE_WIND_CODE)
    } else if code == MISSING_WIND_CODE || !(0.0..=36.0).contains(&code) {
        None
    } else {
        Some(code * 10.0)
    }
}

fn text_field(record: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn mean_of(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Validates one raw record.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the value is not an object, lacks a
/// station code, or has a missing or unparseable `fecha`.
pub fn validate_record(raw: &Value) -> Result<WeatherRecord, ValidationError> {
    let record = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let date_text = match record.get("fecha") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => return Err(ValidationError::InvalidDate(other.to_string())),
        None => return Err(ValidationError::MissingField("fecha")),
    };
    let date = NaiveDate::parse_from_str(&date_text, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(date_text.clone()))?;

    let station = text_field(record, "indicativo").ok_or(ValidationError::MissingField("indicativo"))?;

    let number = |key: &str| record.get(key).and_then(parse_locale_number);

    let values = Observations {
        tavg: number("tmed"),
        tmin: number("tmin"),
        tmax: number("tmax"),
        prcp: record.get("prec").and_then(parse_precipitation),
        wspd: number("velmedia"),
        wpgt: number("racha"),
        wdir: record.get("dir").and_then(parse_wind_direction),
        tsun: number("sol"),
        pres: mean_of(&[number("presMax"), number("presMin")]),
        cldc: None,
        rhum: number("hrMedia"),
    };

    Ok(WeatherRecord {
        date,
        station,
        name: text_field(record, "nombre"),
        province: text_field(record, "provincia"),
        altitude: number("altitud"),
        values,
    })
}

/// Validates a batch, dropping rejected records with a log line each.
pub fn validate_batch(raw: &[Value]) -> Vec<WeatherRecord> {
    let mut rejected = 0usize;
    let records: Vec<WeatherRecord> = raw
        .iter()
        .filter_map(|value| match validate_record(value) {
            Ok(record) => Some(record),
            Err(e) => {
                rejected += 1;
                debug!("Rejected raw record: {}", e);
                None
            }
        })
        .collect();
    if rejected > 0 {
        warn!(
            "Rejected {} of {} raw records during validation",
            rejected,
            raw.len()
        );
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn spanish_decimals_and_trace_precipitation() {
        assert_eq!(parse_locale_number(&json!("10,5")), Some(10.5));
        assert_eq!(parse_locale_number(&json!(" -3,25 ")), Some(-3.25));
        assert_eq!(parse_precipitation(&json!("Ip")), Some(0.0));
        assert_eq!(parse_precipitation(&json!("ip")), Some(0.0));
        assert_eq!(parse_precipitation(&json!("2,4")), Some(2.4));
        assert_eq!(parse_locale_number(&json!("not-a-number")), None);
        assert_eq!(parse_locale_number(&json!("")), None);
        assert_eq!(parse_locale_number(&Value::Null), None);
        // The trace token only means zero for precipitation.
        assert_eq!(parse_locale_number(&json!("Ip")), None);
    }

    #[test]
    fn validates_a_full_record() -> Result<(), ValidationError> {
        let raw = json!({
            "fecha": "2024-03-10",
            "indicativo": "0076",
            "nombre": "BARCELONA AEROPUERTO",
            "provincia": "BARCELONA",
            "altitud": "4",
            "tmed": "14,2",
            "prec": "Ip",
            "tmin": "9,8",
            "tmax": "18,6",
            "dir": "23",
            "velmedia": "3,9",
            "racha": "10,8",
            "sol": "7,5",
            "presMax": "1018,4",
            "presMin": "1012,0",
            "hrMedia": "71"
        });
        let record = validate_record(&raw)?;
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(record.station, "0076");
        assert_eq!(record.altitude, Some(4.0));
        assert_eq!(record.values.tavg, Some(14.2));
        assert_eq!(record.values.prcp, Some(0.0));
        assert_eq!(record.values.wdir, Some(230.0));
        assert_eq!(record.values.rhum, Some(71.0));
        assert!((record.values.pres.unwrap() - 1015.2).abs() < 1e-9);
        assert_eq!(record.values.cldc, None);
        Ok(())
    }

    #[test]
    fn missing_fields_stay_missing() -> Result<(), ValidationError> {
        let raw = json!({"fecha": "2024-03-11", "indicativo": "0076", "tmed": "abc", "dir": "88"});
        let record = validate_record(&raw)?;
        assert_eq!(record.values.tavg, None);
        assert_eq!(record.values.prcp, None);
        assert_eq!(record.values.wdir, None);
        assert_eq!(record.name, None);
        Ok(())
    }

    #[test]
    fn variable_wind_keeps_sentinel() -> Result<(), ValidationError> {
        let raw = json!({"fecha": "2024-03-11", "indicativo": "0076", "dir": "99"});
        assert_eq!(validate_record(&raw)?.values.wdir, Some(99.0));
        Ok(())
    }

    #[test]
    fn bad_dates_are_rejected() {
        let raw = json!({"fecha": "2024-13-45", "indicativo": "0076"});
        assert_eq!(
            validate_record(&raw),
            Err(ValidationError::InvalidDate("2024-13-45".into()))
        );
        let raw = json!({"indicativo": "0076"});
        assert_eq!(validate_record(&raw), Err(ValidationError::MissingField("fecha")));
        assert_eq!(validate_record(&json!([1, 2])), Err(ValidationError::NotAnObject));
    }

    #[test]
    fn batch_skips_rejections() {
        let raw = vec![
            json!({"fecha": "2024-01-01", "indicativo": "0076"}),
            json!({"fecha": "garbage", "indicativo": "0076"}),
            json!({"fecha": "2024-01-02", "indicativo": "0076"}),
        ];
        let records = validate_batch(&raw);
        assert_eq!(records.len(), 2);
    }
}
