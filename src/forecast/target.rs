use crate::types::variable::Variable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A next-day quantity with its own trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Tavg,
    Tmin,
    Tmax,
    Tsun,
    Rhum,
    Wspd,
    /// Whether tomorrow's precipitation exceeds the wet-day threshold.
    Rain,
}

impl Target {
    pub const ALL: [Target; 7] = [
        Target::Tavg,
        Target::Tmin,
        Target::Tmax,
        Target::Tsun,
        Target::Rhum,
        Target::Wspd,
        Target::Rain,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Target::Rain => "rain",
            other => other.variable().column(),
        }
    }

    /// Observed variable the target is derived from.
    pub fn variable(&self) -> Variable {
        match self {
            Target::Tavg => Variable::Tavg,
            Target::Tmin => Variable::Tmin,
            Target::Tmax => Variable::Tmax,
            Target::Tsun => Variable::Tsun,
            Target::Rhum => Variable::Rhum,
            Target::Wspd => Variable::Wspd,
            Target::Rain => Variable::Prcp,
        }
    }

    pub fn is_classification(&self) -> bool {
        matches!(self, Target::Rain)
    }

    /// Column holding this target's prediction in forecast tables.
    pub fn prediction_column(&self) -> String {
        match self {
            Target::Rain => "pred_prob_rain".to_string(),
            other => format!("pred_{}", other.name()),
        }
    }

    /// Training label for an observed value of [`Target::variable`]. NaN stays NaN.
    pub fn label(&self, observed: f64, wet_day_threshold: f64) -> f64 {
        if observed.is_nan() || !self.is_classification() {
            observed
        } else if observed > wet_day_threshold {
            1.0
        } else {
            0.0
        }
    }

    /// Restricts a prediction to the physically valid range of the target.
    pub fn clamp_prediction(&self, value: f64) -> f64 {
        match self {
            Target::Tsun => value.clamp(0.0, 16.0),
            Target::Rhum => value.clamp(0.0, 100.0),
            Target::Wspd => value.max(0.0),
            Target::Rain => value.clamp(0.0, 1.0),
            Target::Tavg | Target::Tmin | Target::Tmax => value,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Target::ALL.iter().map(Target::name).collect();
                format!("unknown target '{}', expected one of {}", s, known.join(", "))
            })
    }
}
