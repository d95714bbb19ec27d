//! Supervised examples: features at day `t` paired with the target observed at
//! `t + 1`, split chronologically.

use crate::config::ExperimentConfig;
use crate::features::frame::FeatureFrame;
use crate::forecast::target::Target;
use crate::model::gbdt::Matrix;
use chrono::{Duration, NaiveDate};

/// Next-day label for every frame row. The shift never crosses stations, so
/// each station's last row (and any row whose successor is not the next
/// calendar day) gets NaN. `None` if the frame lacks the target's column.
pub fn next_day_labels(frame: &FeatureFrame, target: Target, wet_day_threshold: f64) -> Option<Vec<f64>> {
    let observed = frame.column(target.variable().column())?;
    let mut labels = vec![f64::NAN; frame.len()];
    for (_, range) in frame.groups() {
        for row in range.start..range.end.saturating_sub(1) {
            if frame.date(row + 1) == frame.date(row) + Duration::days(1) {
                labels[row] = target.label(observed[row + 1], wet_day_threshold);
            }
        }
    }
    Some(labels)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Train,
    Validation,
    Test,
}

impl Partition {
    /// Partition of a feature row dated `date`.
    pub fn of(date: NaiveDate, experiment: &ExperimentConfig) -> Self {
        if date < experiment.val_start {
            Partition::Train
        } else if date < experiment.test_start {
            Partition::Validation
        } else {
            Partition::Test
        }
    }
}

/// One chronological partition.
#[derive(Debug, Clone, Default)]
pub struct Split {
    /// Frame rows, in frame order.
    pub rows: Vec<usize>,
    pub features: Matrix,
    pub labels: Vec<f64>,
}

impl Split {
    fn gather(frame: &FeatureFrame, rows: Vec<usize>, labels: &[f64]) -> Self {
        let features = Matrix::gather(frame.columns(), &rows);
        let labels = rows.iter().map(|r| labels[*r]).collect();
        Self {
            rows,
            features,
            labels,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Train, validation and test partitions for one target.
#[derive(Debug, Clone)]
pub struct SupervisedSet {
    pub train: Split,
    pub valid: Split,
    pub test: Split,
}

impl SupervisedSet {
    /// Builds the partitions, dropping rows without a label or with any
    /// undefined feature. `None` if the frame lacks the target's column.
    pub fn build(
        frame: &FeatureFrame,
        target: Target,
        experiment: &ExperimentConfig,
        wet_day_threshold: f64,
    ) -> Option<Self> {
        let labels = next_day_labels(frame, target, wet_day_threshold)?;
        let (mut train, mut valid, mut test) = (Vec::new(), Vec::new(), Vec::new());
        for row in 0..frame.len() {
            if labels[row].is_nan() || frame.row_has_nan(row) {
                continue;
            }
            match Partition::of(frame.date(row), experiment) {
                Partition::Train => train.push(row),
                Partition::Validation => valid.push(row),
                Partition::Test => test.push(row),
            }
        }
        Some(Self {
            train: Split::gather(frame, train, &labels),
            valid: Split::gather(frame, valid, &labels),
            test: Split::gather(frame, test, &labels),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ymd;

    fn frame(prcp: &[f64], start: NaiveDate) -> FeatureFrame {
        let dates: Vec<NaiveDate> = (0..prcp.len() as i64).map(|i| start + Duration::days(i)).collect();
        let mut frame = FeatureFrame::new(vec!["prcp".into(), "tavg".into()]);
        let tavg: Vec<f64> = (0..prcp.len()).map(|i| 10.0 + i as f64).collect();
        frame.append_block("0076", &dates, vec![prcp.to_vec(), tavg]);
        frame
    }

    #[test]
    fn binary_target_is_next_day_wetness() {
        let frame = frame(&[0.0, 0.3, 0.05, 5.0], ymd(2020, 3, 1));
        let labels = next_day_labels(&frame, Target::Rain, 0.1).unwrap();
        assert_eq!(&labels[..3], &[1.0, 0.0, 1.0]);
        assert!(labels[3].is_nan());
    }

    #[test]
    fn shift_stays_within_station() {
        let d = ymd(2020, 1, 1);
        let mut frame = FeatureFrame::new(vec!["tavg".into()]);
        frame.append_block("A", &[d, d + Duration::days(1)], vec![vec![1.0, 2.0]]);
        frame.append_block("B", &[d, d + Duration::days(1)], vec![vec![30.0, 40.0]]);
        let labels = next_day_labels(&frame, Target::Tavg, 0.1).unwrap();
        assert_eq!(labels[0], 2.0);
        assert!(labels[1].is_nan());
        assert_eq!(labels[2], 40.0);
        assert!(labels[3].is_nan());
        assert!(next_day_labels(&frame, Target::Rhum, 0.1).is_none());
    }

    #[test]
    fn chronological_split_without_leakage() {
        let experiment = ExperimentConfig::builder()
            .val_start(ymd(2020, 1, 5))
            .test_start(ymd(2020, 1, 8))
            .build();
        let prcp = [0.0, 1.0, f64::NAN, 0.0, 2.0, 0.0, 0.0, 3.0, 0.0, 0.0];
        let frame = frame(&prcp, ymd(2020, 1, 1));
        let set = SupervisedSet::build(&frame, Target::Tavg, &experiment, 0.1).unwrap();

        // Row 2 has a NaN feature, row 9 has no next day.
        assert_eq!(set.train.rows, vec![0, 1, 3]);
        assert_eq!(set.valid.rows, vec![4, 5, 6]);
        assert_eq!(set.test.rows, vec![7, 8]);
        assert_eq!(set.train.features.rows(), 3);

        let max_train = set.train.rows.iter().map(|r| frame.date(*r)).max().unwrap();
        let min_test = set.test.rows.iter().map(|r| frame.date(*r)).min().unwrap();
        assert!(max_train < min_test);

        // No feature column equals the label.
        for j in 0..set.train.features.width() {
            assert_ne!(set.train.features.column(j), set.train.labels.as_slice());
        }
    }
}
