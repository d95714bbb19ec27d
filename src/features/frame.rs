use chrono::NaiveDate;
use std::collections::HashMap;
use std::ops::Range;

/// Column-major numeric table of model inputs.
///
/// Rows of one station are contiguous and date-ascending; [`FeatureFrame::groups`]
/// gives each station's row range so per-station shifts never cross stations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    stations: Vec<String>,
    dates: Vec<NaiveDate>,
    groups: Vec<(String, Range<usize>)>,
}

impl FeatureFrame {
    pub fn new(names: Vec<String>) -> Self {
        let columns = vec![Vec::new(); names.len()];
        Self {
            names,
            columns,
            ..Default::default()
        }
    }

    /// Appends one station's rows. `block` holds one column per name, each as
    /// long as `dates`.
    pub(crate) fn append_block(&mut self, code: &str, dates: &[NaiveDate], block: Vec<Vec<f64>>) {
        let start = self.len();
        for (column, values) in self.columns.iter_mut().zip(block) {
            column.extend(values);
        }
        self.dates.extend_from_slice(dates);
        self.stations
            .extend(std::iter::repeat(code.to_string()).take(dates.len()));
        self.groups.push((code.to_string(), start..self.len()));
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.columns[idx].as_slice())
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn station(&self, row: usize) -> &str {
        &self.stations[row]
    }

    pub fn date(&self, row: usize) -> NaiveDate {
        self.dates[row]
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn groups(&self) -> &[(String, Range<usize>)] {
        &self.groups
    }

    /// Last row of `code`, if the station is present.
    pub fn last_row_of(&self, code: &str) -> Option<usize> {
        self.groups
            .iter()
            .find(|(c, range)| c == code && !range.is_empty())
            .map(|(_, range)| range.end - 1)
    }

    /// Position of each of `names` in this frame, `None` where absent.
    pub fn projection(&self, names: &[String]) -> Vec<Option<usize>> {
        let index: HashMap<&str, usize> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        names.iter().map(|n| index.get(n.as_str()).copied()).collect()
    }

    /// Values of `row` laid out by `projection`; absent features read as 0.
    pub fn projected_row(&self, row: usize, projection: &[Option<usize>]) -> Vec<f64> {
        projection
            .iter()
            .map(|idx| idx.map_or(0.0, |i| self.columns[i][row]))
            .collect()
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[row]).collect()
    }

    /// True if any feature of `row` is NaN.
    pub fn row_has_nan(&self, row: usize) -> bool {
        self.columns.iter().any(|c| c[row].is_nan())
    }
}
