//! Contains [`CanonicalSeries`], the dense per-station daily table produced by
//! fusion and consumed by feature engineering.

use crate::types::station::StationMeta;
use crate::types::variable::Variable;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// Every calendar day in `[global_start, global_end]` for one station, each
/// variable fully populated, plus the estimation flags recording which values
/// were imputed.
///
/// The series is also the world-state the recursive simulator appends
/// synthetic days to, hence [`CanonicalSeries::push_day`].
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSeries {
    pub meta: StationMeta,
    dates: Vec<NaiveDate>,
    values: BTreeMap<Variable, Vec<f64>>,
    estimated: BTreeMap<Variable, Vec<bool>>,
}

impl CanonicalSeries {
    /// Builds a series from dense columns.
    ///
    /// Every variable in [`Variable::ALL`] must have a column of the same
    /// length as `dates`; absent variables are filled with their default and
    /// flagged as estimated.
    pub fn from_columns(
        meta: StationMeta,
        dates: Vec<NaiveDate>,
        mut values: BTreeMap<Variable, Vec<f64>>,
        mut estimated: BTreeMap<Variable, Vec<bool>>,
    ) -> Self {
        let len = dates.len();
        for variable in Variable::ALL {
            let column = values
                .entry(variable)
                .or_insert_with(|| vec![variable.default_fill(); len]);
            column.resize(len, variable.default_fill());
            let flags = estimated.entry(variable).or_insert_with(|| vec![true; len]);
            flags.resize(len, true);
        }
        Self {
            meta,
            dates,
            values,
            estimated,
        }
    }

    pub fn code(&self) -> &str {
        &self.meta.code
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn values(&self, variable: Variable) -> &[f64] {
        self.values.get(&variable).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn values_mut(&mut self, variable: Variable) -> &mut [f64] {
        self.values
            .get_mut(&variable)
            .map(Vec::as_mut_slice)
            .unwrap_or(&mut [])
    }

    pub fn estimated(&self, variable: Variable) -> &[bool] {
        self.estimated.get(&variable).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn value_at(&self, variable: Variable, row: usize) -> Option<f64> {
        self.values(variable).get(row).copied()
    }

    /// Position of `date` in the series, if present.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Copy of the rows strictly before `cutoff`.
    pub fn truncated_before(&self, cutoff: NaiveDate) -> CanonicalSeries {
        let end = self.dates.partition_point(|d| *d < cutoff);
        CanonicalSeries {
            meta: self.meta.clone(),
            dates: self.dates[..end].to_vec(),
            values: self
                .values
                .iter()
                .map(|(v, col)| (*v, col[..end].to_vec()))
                .collect(),
            estimated: self
                .estimated
                .iter()
                .map(|(v, col)| (*v, col[..end].to_vec()))
                .collect(),
        }
    }

    /// Appends the day after the current last date. Variables missing from
    /// `values` carry forward their last value.
    pub fn push_day(&mut self, values: &BTreeMap<Variable, f64>, estimated: bool) -> NaiveDate {
        let date = self
            .last_date()
            .map(|d| d + Duration::days(1))
            .unwrap_or(NaiveDate::MIN);
        for variable in Variable::ALL {
            let column = self.values.entry(variable).or_default();
            let carried = column.last().copied().unwrap_or(variable.default_fill());
            column.push(values.get(&variable).copied().unwrap_or(carried));
            self.estimated.entry(variable).or_default().push(estimated);
        }
        self.dates.push(date);
        date
    }

    /// Share of rows flagged as estimated for `variable`, in `[0, 1]`.
    pub fn estimated_ratio(&self, variable: Variable) -> f64 {
        let flags = self.estimated(variable);
        if flags.is_empty() {
            return 0.0;
        }
        flags.iter().filter(|f| **f).count() as f64 / flags.len() as f64
    }
}

/// Inclusive daily calendar between two dates.
pub fn calendar(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}
