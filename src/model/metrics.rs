//! Evaluation metrics for regression and binary classification.
//!
//! Regression metrics return `NaN` on empty input. Classification inputs are
//! `bool` labels with either scores (ranking metrics) or hard predictions.

use ordered_float::OrderedFloat;

fn paired<'a>(y_true: &'a [f64], y_pred: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
    y_true.iter().copied().zip(y_pred.iter().copied())
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean(paired(y_true, y_pred).map(|(t, p)| (t - p).abs()))
}

pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean(paired(y_true, y_pred).map(|(t, p)| (t - p) * (t - p)))
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mse(y_true, y_pred).sqrt()
}

pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

pub fn median_ae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let mut errors: Vec<f64> = paired(y_true, y_pred).map(|(t, p)| (t - p).abs()).collect();
    median(&mut errors)
}

/// Coefficient of determination. A constant target scores 1 when predicted
/// exactly and 0 otherwise.
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return f64::NAN;
    }
    let y_mean = mean(y_true.iter().copied());
    let ss_res: f64 = paired(y_true, y_pred).map(|(t, p)| (t - p) * (t - p)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - y_mean) * (t - y_mean)).sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

/// Area under the ROC curve via the rank-sum statistic, averaging ranks over
/// tied scores. `None` if only one class is present.
pub fn roc_auc(labels: &[bool], scores: &[f64]) -> Option<f64> {
    let n = labels.len().min(scores.len());
    let positives = labels[..n].iter().filter(|l| **l).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by_key(|i| OrderedFloat(scores[*i]));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // 1-based ranks i+1..=j+1 share their average.
        let average_rank = (i + j) as f64 / 2.0 + 1.0;
        let tied_positives = order[i..=j].iter().filter(|k| labels[**k]).count();
        positive_rank_sum += average_rank * tied_positives as f64;
        i = j + 1;
    }

    let p = positives as f64;
    Some((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Mean binary cross-entropy with probabilities clipped away from 0 and 1.
pub fn log_loss(labels: &[bool], probabilities: &[f64]) -> f64 {
    const EPS: f64 = 1e-15;
    mean(labels.iter().zip(probabilities).map(|(label, p)| {
        let p = p.clamp(EPS, 1.0 - EPS);
        if *label {
            -p.ln()
        } else {
            -(1.0 - p).ln()
        }
    }))
}

/// Counts of a binary confusion matrix.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Confusion {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl Confusion {
    pub fn from_predictions(labels: &[bool], predicted: &[bool]) -> Self {
        let mut c = Confusion::default();
        for (label, pred) in labels.iter().zip(predicted) {
            match (*label, *pred) {
                (true, true) => c.tp += 1,
                (false, true) => c.fp += 1,
                (false, false) => c.tn += 1,
                (true, false) => c.fn_ += 1,
            }
        }
        c
    }

    fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Matthews correlation coefficient, 0 when any marginal is empty.
    pub fn mcc(&self) -> f64 {
        let (tp, fp, tn, fn_) = (self.tp as f64, self.fp as f64, self.tn as f64, self.fn_ as f64);
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        if denominator == 0.0 {
            0.0
        } else {
            (tp * tn - fp * fn_) / denominator
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
