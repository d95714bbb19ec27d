//! Defines the daily weather variables carried through the pipeline and the
//! column names they use in every on-disk artifact.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A daily weather variable tracked per station.
///
/// Column names follow the short codes used by bulk daily weather archives
/// (`tavg`, `prcp`, `wspd`, ...), extended with `cldc` for cloud cover and
/// `rhum` for mean relative humidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variable {
    /// Mean air temperature (°C).
    Tavg,
    /// Minimum air temperature (°C).
    Tmin,
    /// Maximum air temperature (°C).
    Tmax,
    /// Daily precipitation total (mm).
    Prcp,
    /// Mean wind speed.
    Wspd,
    /// Peak wind gust.
    Wpgt,
    /// Dominant wind direction (degrees, with a calm/variable sentinel).
    Wdir,
    /// Sunshine duration (hours).
    Tsun,
    /// Mean sea-level pressure (hPa).
    Pres,
    /// Mean cloud cover (%).
    Cldc,
    /// Mean relative humidity (%).
    Rhum,
}

impl Variable {
    pub const ALL: [Variable; 11] = [
        Variable::Tavg,
        Variable::Tmin,
        Variable::Tmax,
        Variable::Prcp,
        Variable::Wspd,
        Variable::Wpgt,
        Variable::Wdir,
        Variable::Tsun,
        Variable::Pres,
        Variable::Cldc,
        Variable::Rhum,
    ];

    /// Variables filled by interpolation and climatology during fusion.
    pub const CONTINUOUS: [Variable; 9] = [
        Variable::Tavg,
        Variable::Tmin,
        Variable::Tmax,
        Variable::Rhum,
        Variable::Wspd,
        Variable::Wpgt,
        Variable::Pres,
        Variable::Cldc,
        Variable::Tsun,
    ];

    /// Variables whose canonical value comes from the secondary physics source.
    pub const PHYSICS: [Variable; 3] = [Variable::Tsun, Variable::Pres, Variable::Cldc];

    pub fn column(&self) -> &'static str {
        match self {
            Variable::Tavg => "tavg",
            Variable::Tmin => "tmin",
            Variable::Tmax => "tmax",
            Variable::Prcp => "prcp",
            Variable::Wspd => "wspd",
            Variable::Wpgt => "wpgt",
            Variable::Wdir => "wdir",
            Variable::Tsun => "tsun",
            Variable::Pres => "pres",
            Variable::Cldc => "cldc",
            Variable::Rhum => "rhum",
        }
    }

    pub fn from_column(name: &str) -> Option<Variable> {
        Variable::ALL.into_iter().find(|v| v.column() == name)
    }

    /// Name of the companion estimation flag column.
    pub fn flag_column(&self) -> String {
        format!("{}_est", self.column())
    }

    /// Last-resort fill value when neither interpolation nor climatology can
    /// supply one.
    pub fn default_fill(&self) -> f64 {
        match self {
            Variable::Pres => 1013.0,
            _ => 0.0,
        }
    }

    /// Physically valid range enforced by the quality audit.
    pub fn physical_bounds(&self) -> Option<(f64, f64)> {
        match self {
            Variable::Rhum | Variable::Cldc => Some((0.0, 100.0)),
            Variable::Tsun => Some((0.0, 24.0)),
            _ => None,
        }
    }
}

/// Formats a `Variable` as its column name.
///
/// # Examples
///
/// ```
/// use rainbow_forecast::Variable;
///
/// assert_eq!(Variable::Rhum.to_string(), "rhum");
/// assert_eq!(format!("{}", Variable::Prcp), "prcp");
/// ```
impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_names_round_trip() {
        for variable in Variable::ALL {
            assert_eq!(Variable::from_column(variable.column()), Some(variable));
        }
        assert_eq!(Variable::from_column("snow"), None);
    }

    #[test]
    fn pressure_defaults_to_standard_atmosphere() {
        assert_eq!(Variable::Pres.default_fill(), 1013.0);
        assert_eq!(Variable::Tavg.default_fill(), 0.0);
        assert_eq!(Variable::Pres.flag_column(), "pres_est");
    }
}
