//! Gap-filling tiers for a single daily column: bounded linear interpolation,
//! then day-of-year climatology, then month climatology, then a fixed default.

use chrono::{Datelike, NaiveDate};

/// How many cells each tier filled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FillCounts {
    pub interpolated: usize,
    pub day_of_year: usize,
    pub month: usize,
    pub default: usize,
}

impl FillCounts {
    pub fn total(&self) -> usize {
        self.interpolated + self.day_of_year + self.month + self.default
    }
}

/// Linearly interpolates interior runs of NaN no longer than `limit`.
///
/// Runs touching either end of the slice, or longer than `limit`, are left
/// untouched. Returns the number of filled cells.
pub fn interpolate_limited(values: &mut [f64], limit: usize) -> usize {
    let n = values.len();
    let mut filled = 0;
    let mut i = 0;
    while i < n {
        if !values[i].is_nan() {
            i += 1;
            continue;
        }
        let start = i;
        while i < n && values[i].is_nan() {
            i += 1;
        }
        let gap = i - start;
        if start == 0 || i == n || gap > limit {
            continue;
        }
        let left = values[start - 1];
        let right = values[i];
        let span = (gap + 1) as f64;
        for (k, slot) in values[start..i].iter_mut().enumerate() {
            *slot = left + (right - left) * (k + 1) as f64 / span;
        }
        filled += gap;
    }
    filled
}

/// Mean of a column by day-of-year and by month, over its non-NaN cells.
#[derive(Debug, Clone)]
pub struct Climatology {
    by_day: Vec<Option<f64>>,
    by_month: Vec<Option<f64>>,
}

fn means(sums: Vec<(f64, usize)>) -> Vec<Option<f64>> {
    sums.into_iter()
        .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
        .collect()
}

impl Climatology {
    pub fn from_values(dates: &[NaiveDate], values: &[f64]) -> Self {
        let mut by_day = vec![(0.0, 0usize); 367];
        let mut by_month = vec![(0.0, 0usize); 13];
        for (date, value) in dates.iter().zip(values) {
            if value.is_nan() {
                continue;
            }
            let day = &mut by_day[date.ordinal() as usize];
            day.0 += value;
            day.1 += 1;
            let month = &mut by_month[date.month() as usize];
            month.0 += value;
            month.1 += 1;
        }
        Self {
            by_day: means(by_day),
            by_month: means(by_month),
        }
    }

    pub fn day_of_year(&self, date: NaiveDate) -> Option<f64> {
        self.by_day[date.ordinal() as usize]
    }

    pub fn month(&self, date: NaiveDate) -> Option<f64> {
        self.by_month[date.month() as usize]
    }

    /// Fills every remaining NaN in `values`, returning per-tier counts.
    pub fn fill(&self, dates: &[NaiveDate], values: &mut [f64], default: f64) -> FillCounts {
        let mut counts = FillCounts::default();
        for (date, slot) in dates.iter().zip(values.iter_mut()) {
            if !slot.is_nan() {
                continue;
            }
            if let Some(mean) = self.day_of_year(*date) {
                *slot = mean;
                counts.day_of_year += 1;
            } else if let Some(mean) = self.month(*date) {
                *slot = mean;
                counts.month += 1;
            } else {
                *slot = default;
                counts.default += 1;
            }
        }
        counts
    }
}

/// Runs every tier over one column. The climatology is computed after
/// interpolation, from observed and interpolated cells.
pub fn impute_column(dates: &[NaiveDate], values: &mut [f64], max_gap: usize, default: f64) -> FillCounts {
    let interpolated = interpolate_limited(values, max_gap);
    let climatology = Climatology::from_values(dates, values);
    let mut counts = climatology.fill(dates, values, default);
    counts.interpolated = interpolated;
    counts
}

/// Forward-fills then back-fills NaN cells, using `default` if the column is
/// entirely empty. Suited to circular or categorical columns.
pub fn fill_forward_backward(values: &mut [f64], default: f64) -> usize {
    let mut filled = 0;
    let mut last = None;
    for slot in values.iter_mut() {
        if slot.is_nan() {
            if let Some(v) = last {
                *slot = v;
                filled += 1;
            }
        } else {
            last = Some(*slot);
        }
    }
    let first = values.iter().copied().find(|v| !v.is_nan()).unwrap_or(default);
    for slot in values.iter_mut().take_while(|v| v.is_nan()) {
        *slot = first;
        filled += 1;
    }
    filled
}
