use crate::config::FeatureConfig;
use crate::features::frame::FeatureFrame;
use crate::types::series::CanonicalSeries;
use crate::types::variable::Variable;
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, VecDeque};
use std::f64::consts::PI;
use std::ops::Range;

/// Variables copied into the frame as same-day inputs. Wind direction enters
/// only through its unit-vector components.
pub const BASE_COLUMNS: [Variable; 10] = [
    Variable::Tavg,
    Variable::Tmin,
    Variable::Tmax,
    Variable::Prcp,
    Variable::Wspd,
    Variable::Wpgt,
    Variable::Tsun,
    Variable::Pres,
    Variable::Cldc,
    Variable::Rhum,
];

pub fn lag_name(variable: Variable, lag: usize) -> String {
    format!("{}_lag_{}", variable.column(), lag)
}

pub fn rolling_name(variable: Variable, window: usize) -> String {
    format!("{}_roll_{}", variable.column(), window)
}

pub fn trend_name(variable: Variable) -> String {
    format!("{}_trend", variable.column())
}

/// Value `lag` rows earlier, NaN where that row is outside the slice.
fn shifted(values: &[f64], lag: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i >= lag { values[i - lag] } else { f64::NAN })
        .collect()
}

/// Trailing mean over the current row and the `window - 1` before it. NaN
/// until the window is full.
fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut buffer: VecDeque<f64> = VecDeque::with_capacity(window + 1);
    for value in values {
        buffer.push_back(*value);
        if buffer.len() > window {
            buffer.pop_front();
        }
        if buffer.len() == window {
            out.push(buffer.iter().sum::<f64>() / window as f64);
        } else {
            out.push(f64::NAN);
        }
    }
    out
}

/// `range` of a series column, empty if the column is shorter.
fn column_range<'s>(series: &'s CanonicalSeries, variable: Variable, range: &Range<usize>) -> &'s [f64] {
    series.values(variable).get(range.clone()).unwrap_or(&[])
}

fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// Derives model inputs from canonical series.
///
/// The same instance (same [`FeatureConfig`]) must be used for training and
/// for both forecasting modes, since trained models are bound to the exact
/// feature names produced here. Every feature at row `t` reads only rows `<= t`
/// of the same station.
pub struct FeatureEngineer<'a> {
    config: &'a FeatureConfig,
}

impl<'a> FeatureEngineer<'a> {
    pub fn new(config: &'a FeatureConfig) -> Self {
        Self { config }
    }

    /// Longest look-back, in rows, of any feature. A row has every feature
    /// defined once it has this many predecessors.
    pub fn required_lookback(&self) -> usize {
        let max_lag = self.config.lags.iter().copied().max().unwrap_or(0);
        let max_window = self.config.windows.iter().copied().max().unwrap_or(0);
        let trend = if self.config.trend_columns.is_empty() { 0 } else { 2 };
        max_lag.max(max_window.saturating_sub(1)).max(trend).max(1)
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ["month_sin", "month_cos", "day_sin", "day_cos", "wind_sin", "wind_cos"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        names.extend(BASE_COLUMNS.iter().map(|v| v.column().to_string()));
        for variable in &self.config.lag_columns {
            for lag in &self.config.lags {
                names.push(lag_name(*variable, *lag));
            }
        }
        names.extend(self.config.trend_columns.iter().map(|v| trend_name(*v)));
        for variable in &self.config.rolling_columns {
            for window in &self.config.windows {
                names.push(rolling_name(*variable, *window));
            }
        }
        names.extend(["pres_diff", "cloud_moisture", "station_id"].iter().map(|s| s.to_string()));
        names
    }

    /// Label encoding of station codes, ordered by code.
    pub fn station_ids(series: &[CanonicalSeries]) -> BTreeMap<String, f64> {
        let mut codes: Vec<&str> = series.iter().map(CanonicalSeries::code).collect();
        codes.sort_unstable();
        codes.dedup();
        codes
            .into_iter()
            .enumerate()
            .map(|(i, code)| (code.to_string(), i as f64))
            .collect()
    }

    /// Features for every row of every series.
    pub fn build(&self, series: &[CanonicalSeries]) -> FeatureFrame {
        let ids = Self::station_ids(series);
        self.build_with(series, &ids, |s| 0..s.len())
    }

    /// Features recomputed over only the last `rows` rows of each series, as
    /// the recursive simulator does. `rows` must exceed
    /// [`required_lookback`](Self::required_lookback) for the last row to be
    /// complete.
    ///
    /// `ids` must be the [`station_ids`](Self::station_ids) of the dataset the
    /// models were trained on, so a subset of stations keeps its encoding.
    pub fn build_tail(
        &self,
        series: &[CanonicalSeries],
        rows: usize,
        ids: &BTreeMap<String, f64>,
    ) -> FeatureFrame {
        self.build_with(series, ids, |s| s.len().saturating_sub(rows)..s.len())
    }

    fn build_with(
        &self,
        series: &[CanonicalSeries],
        ids: &BTreeMap<String, f64>,
        range_of: impl Fn(&CanonicalSeries) -> Range<usize>,
    ) -> FeatureFrame {
        let mut frame = FeatureFrame::new(self.feature_names());
        for s in series {
            let range = range_of(s);
            let station_id = ids.get(s.code()).copied().unwrap_or(f64::NAN);
            let block = self.station_block(s, range.clone(), station_id);
            frame.append_block(s.code(), &s.dates()[range], block);
        }
        frame
    }

    /// One column per feature name, in [`feature_names`](Self::feature_names) order.
    fn station_block(&self, series: &CanonicalSeries, range: Range<usize>, station_id: f64) -> Vec<Vec<f64>> {
        let dates: &[NaiveDate] = &series.dates()[range.clone()];
        let column = |v: Variable| column_range(series, v, &range);
        let n = dates.len();
        let mut block: Vec<Vec<f64>> = Vec::new();

        let (month_sin, month_cos): (Vec<f64>, Vec<f64>) =
            dates.iter().map(|d| cyclical(d.month() as f64, 12.0)).unzip();
        let (day_sin, day_cos): (Vec<f64>, Vec<f64>) =
            dates.iter().map(|d| cyclical(d.ordinal() as f64, 365.0)).unzip();
        let sentinel = self.config.calm_wind_sentinel;
        let (wind_sin, wind_cos): (Vec<f64>, Vec<f64>) = column(Variable::Wdir)
            .iter()
            .map(|deg| {
                let deg = if deg.is_nan() || *deg == sentinel { 0.0 } else { *deg };
                let rad = deg.to_radians();
                (rad.sin(), rad.cos())
            })
            .unzip();
        block.extend([month_sin, month_cos, day_sin, day_cos, wind_sin, wind_cos]);

        for variable in BASE_COLUMNS {
            block.push(column(variable).to_vec());
        }
        for variable in &self.config.lag_columns {
            for lag in &self.config.lags {
                block.push(shifted(column(*variable), *lag));
            }
        }
        for variable in &self.config.trend_columns {
            let values = column(*variable);
            let trend = (0..values.len())
                .map(|i| if i >= 2 { values[i - 1] - values[i - 2] } else { f64::NAN })
                .collect();
            block.push(trend);
        }
        for variable in &self.config.rolling_columns {
            for window in &self.config.windows {
                block.push(rolling_mean(column(*variable), *window));
            }
        }

        let pres = column(Variable::Pres);
        let pres_diff = (0..pres.len())
            .map(|i| if i >= 1 { pres[i] - pres[i - 1] } else { f64::NAN })
            .collect();
        let cloud_moisture = column(Variable::Cldc)
            .iter()
            .zip(column(Variable::Rhum))
            .map(|(c, h)| c * h / 100.0)
            .collect();
        block.extend([pres_diff, cloud_moisture, vec![station_id; n]]);

        for values in &mut block {
            values.resize(n, f64::NAN);
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::series::calendar;
    use crate::types::station::StationMeta;

    fn series(code: &str, days: usize, offset: f64) -> CanonicalSeries {
        let start = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let dates = calendar(start, start + chrono::Duration::days(days as i64 - 1));
        let mut values = BTreeMap::new();
        values.insert(Variable::Tavg, (0..days).map(|i| offset + i as f64).collect());
        values.insert(Variable::Pres, (0..days).map(|i| 1000.0 + (i * i) as f64).collect());
        values.insert(Variable::Wdir, vec![99.0; days]);
        values.insert(Variable::Cldc, vec![50.0; days]);
        values.insert(Variable::Rhum, vec![80.0; days]);
        CanonicalSeries::from_columns(
            StationMeta {
                code: code.into(),
                ..Default::default()
            },
            dates,
            values,
            BTreeMap::new(),
        )
    }

    #[test]
    fn lags_and_rolling_windows_are_causal() {
        let config = FeatureConfig::default();
        let engineer = FeatureEngineer::new(&config);
        let all = vec![series("0076", 30, 0.0), series("0201D", 30, 100.0)];
        let frame = engineer.build(&all);

        let tavg = frame.column("tavg").unwrap();
        let lag7 = frame.column("tavg_lag_7").unwrap();
        let roll3 = frame.column("tavg_roll_3").unwrap();
        for (_, range) in frame.groups() {
            for t in range.clone() {
                let local = t - range.start;
                if local >= 7 {
                    assert_eq!(lag7[t], tavg[t - 7]);
                } else {
                    assert!(lag7[t].is_nan(), "lag must not reach into another station");
                }
                if local >= 2 {
                    let expected = (tavg[t] + tavg[t - 1] + tavg[t - 2]) / 3.0;
                    assert!((roll3[t] - expected).abs() < 1e-12);
                } else {
                    assert!(roll3[t].is_nan());
                }
            }
        }
        assert_eq!(frame.column("tavg_trend").unwrap()[5], 1.0);
        assert_eq!(frame.column("wind_sin").unwrap()[0], 0.0);
        assert_eq!(frame.column("wind_cos").unwrap()[0], 1.0);
        assert_eq!(frame.column("cloud_moisture").unwrap()[0], 40.0);
        assert_eq!(frame.column("station_id").unwrap()[30], 1.0);
    }

    #[test]
    fn future_values_do_not_change_past_features() {
        let config = FeatureConfig::default();
        let engineer = FeatureEngineer::new(&config);
        let base = series("0076", 30, 0.0);
        let mut perturbed = base.clone();
        perturbed.values_mut(Variable::Tavg)[29] = 1e6;

        let a = engineer.build(std::slice::from_ref(&base));
        let b = engineer.build(std::slice::from_ref(&perturbed));
        let tavg_idx = a.names().iter().position(|n| n == "tavg").unwrap();
        for row in 0..29 {
            let (ra, rb) = (a.row(row), b.row(row));
            for (i, (x, y)) in ra.iter().zip(&rb).enumerate() {
                assert!(x == y || (x.is_nan() && y.is_nan()), "feature {i} at row {row}");
            }
        }
        assert_ne!(a.row(29)[tavg_idx], b.row(29)[tavg_idx]);
    }

    #[test]
    fn tail_matches_full_history_on_last_row() {
        let config = FeatureConfig::default();
        let engineer = FeatureEngineer::new(&config);
        assert_eq!(engineer.required_lookback(), 13);
        let all = vec![series("0076", 60, 0.0)];
        let full = engineer.build(&all);
        let ids = FeatureEngineer::station_ids(&all);
        let tail = engineer.build_tail(&all, engineer.required_lookback() + 1, &ids);
        assert_eq!(tail.len(), 14);
        let last_full = full.row(full.len() - 1);
        let last_tail = tail.row(tail.len() - 1);
        assert_eq!(last_full, last_tail);
        assert!(!tail.row_has_nan(tail.len() - 1));
    }

    #[test]
    fn tail_of_a_subset_keeps_the_full_station_encoding() {
        let config = FeatureConfig::default();
        let engineer = FeatureEngineer::new(&config);
        let all = vec![series("0076", 30, 0.0), series("0200E", 30, 50.0), series("0201D", 30, 100.0)];
        let ids = FeatureEngineer::station_ids(&all);
        assert_eq!(ids["0201D"], 2.0);

        let subset = &all[2..];
        let tail = engineer.build_tail(subset, 20, &ids);
        let station_id = tail.column("station_id").unwrap();
        assert!(station_id.iter().all(|v| *v == 2.0));
        let full = engineer.build(&all);
        assert_eq!(full.row(full.len() - 1), tail.row(tail.len() - 1));

        let unknown = engineer.build_tail(&all[..1], 20, &BTreeMap::new());
        assert!(unknown.column("station_id").unwrap().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn no_feature_is_named_after_a_future_value() {
        let config = FeatureConfig::default();
        let names = FeatureEngineer::new(&config).feature_names();
        assert!(names.iter().all(|n| !n.contains("lead") && !n.ends_with("_est")));
        let unique: std::collections::BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
