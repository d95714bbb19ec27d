use crate::types::variable::Variable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Optional daily measurements for one station-day. `None` means the sensor
/// reported nothing; it is never coerced to zero.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Observations {
    pub tavg: Option<f64>, // mean temperature (°C)
    pub tmin: Option<f64>, // minimum temperature (°C)
    pub tmax: Option<f64>, // maximum temperature (°C)
    pub prcp: Option<f64>, // precipitation (mm)
    pub wspd: Option<f64>, // mean wind speed
    pub wpgt: Option<f64>, // peak gust
    pub wdir: Option<f64>, // wind direction (degrees)
    pub tsun: Option<f64>, // sunshine (hours)
    pub pres: Option<f64>, // mean pressure (hPa)
    pub cldc: Option<f64>, // cloud cover (%)
    pub rhum: Option<f64>, // mean relative humidity (%)
}

impl Observations {
    pub fn get(&self, variable: Variable) -> Option<f64> {
        match variable {
            Variable::Tavg => self.tavg,
            Variable::Tmin => self.tmin,
            Variable::Tmax => self.tmax,
            Variable::Prcp => self.prcp,
            Variable::Wspd => self.wspd,
            Variable::Wpgt => self.wpgt,
            Variable::Wdir => self.wdir,
            Variable::Tsun => self.tsun,
            Variable::Pres => self.pres,
            Variable::Cldc => self.cldc,
            Variable::Rhum => self.rhum,
        }
    }

    pub fn set(&mut self, variable: Variable, value: Option<f64>) {
        let slot = match variable {
            Variable::Tavg => &mut self.tavg,
            Variable::Tmin => &mut self.tmin,
            Variable::Tmax => &mut self.tmax,
            Variable::Prcp => &mut self.prcp,
            Variable::Wspd => &mut self.wspd,
            Variable::Wpgt => &mut self.wpgt,
            Variable::Wdir => &mut self.wdir,
            Variable::Tsun => &mut self.tsun,
            Variable::Pres => &mut self.pres,
            Variable::Cldc => &mut self.cldc,
            Variable::Rhum => &mut self.rhum,
        };
        *slot = value;
    }
}

/// One validated station-day from the primary observation source.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub station: String,
    pub name: Option<String>,
    pub province: Option<String>,
    pub altitude: Option<f64>,
    pub values: Observations,
}

/// One day of the secondary physics series for a station location.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PhysicsDay {
    pub date: NaiveDate,
    pub sunshine_hours: Option<f64>,
    pub precipitation: Option<f64>,
    pub pressure: Option<f64>,
    pub cloud_cover: Option<f64>,
}

impl PhysicsDay {
    /// Value this day supplies for a canonical variable, if it supplies one.
    pub fn get(&self, variable: Variable) -> Option<f64> {
        match variable {
            Variable::Tsun => self.sunshine_hours,
            Variable::Pres => self.pressure,
            Variable::Cldc => self.cloud_cover,
            Variable::Prcp => self.precipitation,
            _ => None,
        }
    }
}
