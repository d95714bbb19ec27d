//! Histogram gradient-boosted decision trees.
//!
//! Features are quantized into at most 254 value bins per column (bin 0 holds
//! missing values) and trees grow leaf-wise: the leaf with the largest gain is
//! split next until `num_leaves` is reached or no split improves the loss.
//! Rows with a missing value always take the left branch.

use crate::model::error::ModelError;
use crate::model::metrics::{mae, median, mse, roc_auc};
use bon::Builder;
use log::{debug, info};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    /// Absolute error; leaves are refit to the median residual.
    L1,
    #[default]
    L2,
    /// Log loss on {0, 1} labels; predictions are probabilities.
    Binary,
}

impl Objective {
    fn is_classification(self) -> bool {
        matches!(self, Objective::Binary)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct BoosterParams {
    #[builder(default)]
    pub objective: Objective,
    #[builder(default = 31)]
    pub num_leaves: usize,
    #[builder(default = 0.1)]
    pub learning_rate: f64,
    /// Share of features sampled for each tree.
    #[builder(default = 1.0)]
    pub feature_fraction: f64,
    #[builder(default = 100)]
    pub num_boost_round: usize,
    /// Stop after this many rounds without validation improvement. 0 disables.
    #[builder(default = 0)]
    pub early_stopping_rounds: usize,
    #[builder(default = 20)]
    pub min_data_in_leaf: usize,
    #[builder(default = 1e-3)]
    pub min_sum_hessian_in_leaf: f64,
    #[builder(default = 0.0)]
    pub lambda_l2: f64,
    #[builder(default = 255)]
    pub max_bins: usize,
    #[builder(default = 42)]
    pub seed: u64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Dense column-major training matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    columns: Vec<Vec<f64>>,
    rows: usize,
}

impl Matrix {
    pub fn new(width: usize) -> Self {
        Self {
            columns: vec![Vec::new(); width],
            rows: 0,
        }
    }

    pub fn from_rows(width: usize, rows: &[Vec<f64>]) -> Result<Self, ModelError> {
        let mut matrix = Self::new(width);
        for row in rows {
            matrix.push_row(row)?;
        }
        Ok(matrix)
    }

    /// Copies `rows` of column-major `columns`.
    pub fn gather(columns: &[Vec<f64>], rows: &[usize]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|c| rows.iter().map(|r| c[*r]).collect())
                .collect(),
            rows: rows.len(),
        }
    }

    pub fn push_row(&mut self, row: &[f64]) -> Result<(), ModelError> {
        if row.len() != self.columns.len() {
            return Err(ModelError::FeatureCount {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.push(*value);
        }
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, idx: usize) -> &[f64] {
        &self.columns[idx]
    }

    pub fn row(&self, idx: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[idx]).collect()
    }
}

const MISSING_BIN: u8 = 0;
const MAX_VALUE_BINS: usize = 254;

/// Maps raw values of one feature to bins. Bin `b >= 1` holds values
/// `<= uppers[b - 1]`; the last bin is unbounded above.
#[derive(Debug, Clone)]
struct BinMapper {
    uppers: Vec<f64>,
}

impl BinMapper {
    fn fit(values: &[f64], max_bins: usize) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let value_bins = max_bins.clamp(2, MAX_VALUE_BINS);

        let mut distinct = sorted.clone();
        distinct.dedup();

        let uppers = if distinct.len() <= value_bins {
            distinct.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect()
        } else {
            let n = sorted.len();
            let max = sorted[n - 1];
            let mut uppers: Vec<f64> = (1..value_bins)
                .map(|i| sorted[i * n / value_bins])
                .filter(|u| *u < max)
                .collect();
            uppers.dedup();
            uppers
        };
        Self { uppers }
    }

    fn bin(&self, value: f64) -> u8 {
        if value.is_nan() {
            MISSING_BIN
        } else {
            (1 + self.uppers.partition_point(|u| *u < value)) as u8
        }
    }

    fn num_bins(&self) -> usize {
        self.uppers.len() + 2
    }

    fn threshold(&self, bin: usize) -> f64 {
        self.uppers[bin - 1]
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStat {
    grad: f64,
    hess: f64,
    count: u32,
}

impl BinStat {
    fn add(&mut self, other: BinStat) {
        self.grad += other.grad;
        self.hess += other.hess;
        self.count += other.count;
    }

    fn minus(self, other: BinStat) -> BinStat {
        BinStat {
            grad: self.grad - other.grad,
            hess: self.hess - other.hess,
            count: self.count - other.count,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitInfo {
    gain: f64,
    slot: usize,
    bin: usize,
    left: BinStat,
}

struct LeafState {
    node: usize,
    rows: Vec<u32>,
    hist: Vec<Vec<BinStat>>,
    total: BinStat,
    split: Option<SplitInfo>,
}

#[derive(Debug, PartialEq, Eq)]
struct Candidate {
    gain: OrderedFloat<f64>,
    leaf: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Equal gains resolve to the older leaf.
        self.gain
            .cmp(&other.gain)
            .then_with(|| other.leaf.cmp(&self.leaf))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: u32,
        right: u32,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if value.is_nan() || value <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
            }
        }
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

struct GrownTree {
    tree: Tree,
    leaves: Vec<(usize, Vec<u32>, BinStat)>,
    splits: Vec<(usize, f64)>,
}

struct Grower<'a> {
    bins: &'a [Vec<u8>],
    mappers: &'a [BinMapper],
    features: &'a [usize],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoosterParams,
}

impl Grower<'_> {
    fn histogram(&self, rows: &[u32]) -> Vec<Vec<BinStat>> {
        self.features
            .iter()
            .map(|&f| {
                let mut hist = vec![BinStat::default(); self.mappers[f].num_bins()];
                let column = &self.bins[f];
                for &r in rows {
                    let r = r as usize;
                    let stat = &mut hist[column[r] as usize];
                    stat.grad += self.grad[r];
                    stat.hess += self.hess[r];
                    stat.count += 1;
                }
                hist
            })
            .collect()
    }

    fn leaf_score(&self, stat: BinStat) -> f64 {
        stat.grad * stat.grad / (stat.hess + self.params.lambda_l2)
    }

    fn best_split(&self, hist: &[Vec<BinStat>], total: BinStat) -> Option<SplitInfo> {
        let min_count = self.params.min_data_in_leaf.max(1) as u32;
        let min_hess = self.params.min_sum_hessian_in_leaf;
        let parent = self.leaf_score(total);

        let mut best: Option<SplitInfo> = None;
        for (slot, bins) in hist.iter().enumerate() {
            let mut left = BinStat::default();
            for (bin, stat) in bins.iter().enumerate().take(bins.len().saturating_sub(1)) {
                left.add(*stat);
                if bin == 0 {
                    continue;
                }
                let right = total.minus(left);
                if left.count < min_count || right.count < min_count {
                    continue;
                }
                if left.hess < min_hess || right.hess < min_hess {
                    continue;
                }
                let gain = self.leaf_score(left) + self.leaf_score(right) - parent;
                if gain > best.map_or(0.0, |b| b.gain) {
                    best = Some(SplitInfo {
                        gain,
                        slot,
                        bin,
                        left,
                    });
                }
            }
        }
        best
    }

    fn leaf(&self, node: usize, rows: Vec<u32>, hist: Vec<Vec<BinStat>>, total: BinStat) -> LeafState {
        let split = self.best_split(&hist, total);
        LeafState {
            node,
            rows,
            hist,
            total,
            split,
        }
    }

    fn grow(&self, rows: Vec<u32>) -> GrownTree {
        let mut total = BinStat::default();
        for &r in &rows {
            total.add(BinStat {
                grad: self.grad[r as usize],
                hess: self.hess[r as usize],
                count: 1,
            });
        }

        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let hist = self.histogram(&rows);
        let mut leaves = vec![Some(self.leaf(0, rows, hist, total))];
        let mut heap = BinaryHeap::new();
        if let Some(split) = leaves[0].as_ref().and_then(|l| l.split) {
            heap.push(Candidate {
                gain: OrderedFloat(split.gain),
                leaf: 0,
            });
        }

        let mut splits = Vec::new();
        let mut leaf_count = 1;
        while leaf_count < self.params.num_leaves.max(2) {
            let Some(candidate) = heap.pop() else {
                break;
            };
            let Some(parent) = leaves[candidate.leaf].take() else {
                continue;
            };
            let Some(split) = parent.split else {
                leaves[candidate.leaf] = Some(parent);
                continue;
            };

            let feature = self.features[split.slot];
            let column = &self.bins[feature];
            let (left_rows, right_rows): (Vec<u32>, Vec<u32>) = parent
                .rows
                .iter()
                .partition(|&&r| (column[r as usize] as usize) <= split.bin);

            let left_total = split.left;
            let right_total = parent.total.minus(split.left);
            let left_is_smaller = left_rows.len() <= right_rows.len();
            let small_hist = self.histogram(if left_is_smaller { &left_rows } else { &right_rows });
            let large_hist: Vec<Vec<BinStat>> = parent
                .hist
                .iter()
                .zip(&small_hist)
                .map(|(p, s)| p.iter().zip(s).map(|(p, s)| p.minus(*s)).collect())
                .collect();
            let (left_hist, right_hist) = if left_is_smaller {
                (small_hist, large_hist)
            } else {
                (large_hist, small_hist)
            };

            let left_node = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            let right_node = nodes.len();
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[parent.node] = Node::Split {
                feature,
                threshold: self.mappers[feature].threshold(split.bin),
                left: left_node as u32,
                right: right_node as u32,
            };
            splits.push((feature, split.gain));
            leaf_count += 1;

            for (node, rows, hist, total) in [
                (left_node, left_rows, left_hist, left_total),
                (right_node, right_rows, right_hist, right_total),
            ] {
                let state = self.leaf(node, rows, hist, total);
                let id = leaves.len();
                if let Some(split) = state.split {
                    heap.push(Candidate {
                        gain: OrderedFloat(split.gain),
                        leaf: id,
                    });
                }
                leaves.push(Some(state));
            }
        }

        let leaves = leaves
            .into_iter()
            .flatten()
            .map(|l| (l.node, l.rows, l.total))
            .collect();
        GrownTree {
            tree: Tree { nodes },
            leaves,
            splits,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn initial_score(objective: Objective, labels: &[f64]) -> f64 {
    match objective {
        Objective::L1 => median(&mut labels.to_vec()),
        Objective::L2 => labels.iter().sum::<f64>() / labels.len() as f64,
        Objective::Binary => {
            let p = (labels.iter().sum::<f64>() / labels.len() as f64).clamp(1e-6, 1.0 - 1e-6);
            (p / (1.0 - p)).ln()
        }
    }
}

/// Validation loss used for early stopping; lower is better.
fn validation_loss(objective: Objective, labels: &[f64], raw: &[f64]) -> f64 {
    match objective {
        Objective::L1 => mae(labels, raw),
        Objective::L2 => mse(labels, raw),
        Objective::Binary => {
            let labels: Vec<bool> = labels.iter().map(|l| *l > 0.5).collect();
            -roc_auc(&labels, raw).unwrap_or(0.5)
        }
    }
}

/// A trained ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booster {
    objective: Objective,
    num_features: usize,
    init_score: f64,
    trees: Vec<Tree>,
    importance: Vec<f64>,
    best_iteration: Option<usize>,
}

impl Booster {
    /// Fits an ensemble on `train`. With a validation set and
    /// `early_stopping_rounds > 0`, training stops once the validation metric
    /// stalls and the ensemble is cut back to its best round.
    pub fn train(
        params: &BoosterParams,
        train: &Matrix,
        labels: &[f64],
        valid: Option<(&Matrix, &[f64])>,
    ) -> Result<Self, ModelError> {
        let n = train.rows();
        if n == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if labels.len() != n {
            return Err(ModelError::LabelCount {
                expected: n,
                found: labels.len(),
            });
        }
        let objective = params.objective;
        if objective.is_classification() {
            if let Some(bad) = labels.iter().find(|l| **l != 0.0 && **l != 1.0) {
                return Err(ModelError::InvalidLabel(*bad));
            }
        }

        let width = train.width();
        let mappers: Vec<BinMapper> = (0..width)
            .map(|j| BinMapper::fit(train.column(j), params.max_bins))
            .collect();
        let bins: Vec<Vec<u8>> = (0..width)
            .map(|j| train.column(j).iter().map(|v| mappers[j].bin(*v)).collect())
            .collect();

        let (valid_rows, valid_labels) = match valid {
            Some((matrix, labels)) => {
                if matrix.width() != width {
                    return Err(ModelError::FeatureCount {
                        expected: width,
                        found: matrix.width(),
                    });
                }
                if labels.len() != matrix.rows() {
                    return Err(ModelError::LabelCount {
                        expected: matrix.rows(),
                        found: labels.len(),
                    });
                }
                let rows: Vec<Vec<f64>> = (0..matrix.rows()).map(|i| matrix.row(i)).collect();
                (rows, labels.to_vec())
            }
            None => (Vec::new(), Vec::new()),
        };

        let init_score = initial_score(objective, labels);
        let mut scores = vec![init_score; n];
        let mut valid_scores = vec![init_score; valid_rows.len()];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let all_rows: Vec<u32> = (0..n as u32).collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let sampled = ((params.feature_fraction * width as f64).round() as usize).clamp(1, width.max(1));

        let mut trees = Vec::new();
        let mut tree_splits: Vec<Vec<(usize, f64)>> = Vec::new();
        let mut best: Option<(usize, f64)> = None;

        for round in 0..params.num_boost_round {
            for i in 0..n {
                let (g, h) = match objective {
                    Objective::L1 => ((scores[i] - labels[i]).signum() * f64::from(scores[i] != labels[i]), 1.0),
                    Objective::L2 => (scores[i] - labels[i], 1.0),
                    Objective::Binary => {
                        let p = sigmoid(scores[i]);
                        (p - labels[i], (p * (1.0 - p)).max(1e-16))
                    }
                };
                grad[i] = g;
                hess[i] = h;
            }

            let mut features: Vec<usize> = if sampled < width {
                index::sample(&mut rng, width, sampled).into_vec()
            } else {
                (0..width).collect()
            };
            features.sort_unstable();

            let grower = Grower {
                bins: &bins,
                mappers: &mappers,
                features: &features,
                grad: &grad,
                hess: &hess,
                params,
            };
            let GrownTree {
                mut tree,
                leaves,
                splits,
            } = grower.grow(all_rows.clone());

            for (node, rows, total) in leaves {
                let raw = match objective {
                    Objective::L1 => {
                        let mut residuals: Vec<f64> = rows
                            .iter()
                            .map(|&r| labels[r as usize] - scores[r as usize])
                            .collect();
                        median(&mut residuals)
                    }
                    Objective::L2 | Objective::Binary => -total.grad / (total.hess + params.lambda_l2),
                };
                let value = if raw.is_finite() { raw * params.learning_rate } else { 0.0 };
                tree.nodes[node] = Node::Leaf { value };
                for r in rows {
                    scores[r as usize] += value;
                }
            }
            for (score, row) in valid_scores.iter_mut().zip(&valid_rows) {
                *score += tree.predict(row);
            }
            trees.push(tree);
            tree_splits.push(splits);

            if valid_rows.is_empty() {
                continue;
            }
            let loss = validation_loss(objective, &valid_labels, &valid_scores);
            debug!("Round {}: validation loss {:.6}", round + 1, loss);
            match best {
                Some((best_round, best_loss)) if loss >= best_loss => {
                    if params.early_stopping_rounds > 0
                        && trees.len() - best_round >= params.early_stopping_rounds
                    {
                        info!(
                            "Early stopping at round {}, best round {}",
                            round + 1,
                            best_round
                        );
                        break;
                    }
                }
                _ => best = Some((trees.len(), loss)),
            }
        }

        let best_iteration = match best {
            Some((round, _)) if params.early_stopping_rounds > 0 => {
                trees.truncate(round);
                tree_splits.truncate(round);
                Some(round)
            }
            _ => None,
        };

        let mut importance = vec![0.0; width];
        for (feature, gain) in tree_splits.into_iter().flatten() {
            importance[feature] += gain;
        }

        Ok(Self {
            objective,
            num_features: width,
            init_score,
            trees,
            importance,
            best_iteration,
        })
    }

    /// Untransformed ensemble output.
    pub fn predict_raw(&self, row: &[f64]) -> f64 {
        self.init_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Prediction on the target scale: a probability for the binary
    /// objective, the regression value otherwise.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let raw = self.predict_raw(row);
        if self.objective.is_classification() {
            sigmoid(raw)
        } else {
            raw
        }
    }

    pub fn predict_matrix(&self, matrix: &Matrix) -> Vec<f64> {
        (0..matrix.rows()).map(|i| self.predict(&matrix.row(i))).collect()
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of rounds kept after early stopping.
    pub fn best_iteration(&self) -> Option<usize> {
        self.best_iteration
    }

    /// Total split gain per feature index.
    pub fn feature_importance(&self) -> &[f64] {
        &self.importance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(objective: Objective) -> BoosterParams {
        BoosterParams::builder()
            .objective(objective)
            .num_leaves(8)
            .learning_rate(0.2)
            .num_boost_round(60)
            .min_data_in_leaf(5)
            .build()
    }

    fn step_data(n: usize) -> (Matrix, Vec<f64>) {
        let mut matrix = Matrix::new(2);
        let mut labels = Vec::new();
        for i in 0..n {
            let x = i as f64 / n as f64;
            let noise = ((i * 7919) % 13) as f64 / 13.0;
            matrix.push_row(&[x, noise]).unwrap();
            labels.push(if x < 0.5 { 1.0 } else { 5.0 });
        }
        (matrix, labels)
    }

    #[test]
    fn bins_respect_thresholds() {
        let mapper = BinMapper::fit(&[1.0, 2.0, 3.0, f64::NAN], 255);
        assert_eq!(mapper.bin(f64::NAN), MISSING_BIN);
        assert_eq!(mapper.bin(1.0), 1);
        assert_eq!(mapper.bin(2.0), 2);
        assert_eq!(mapper.bin(9.0), 3);
        assert_eq!(mapper.threshold(1), 1.5);

        let many: Vec<f64> = (0..10_000).map(|i| i as f64).collect();
        let mapper = BinMapper::fit(&many, 255);
        assert!(mapper.num_bins() <= 256);
        assert_eq!(mapper.bin(-1.0), 1);
    }

    #[test]
    fn l2_learns_a_step() {
        let (matrix, labels) = step_data(400);
        let booster = Booster::train(&params(Objective::L2), &matrix, &labels, None).unwrap();
        assert!((booster.predict(&[0.1, 0.5]) - 1.0).abs() < 0.1);
        assert!((booster.predict(&[0.9, 0.5]) - 5.0).abs() < 0.1);
        let importance = booster.feature_importance();
        assert!(importance[0] > importance[1]);
    }

    #[test]
    fn l1_starts_from_the_median() {
        let (matrix, labels) = step_data(401);
        let booster = Booster::train(&params(Objective::L1), &matrix, &labels, None).unwrap();
        assert!((booster.predict(&[0.2, 0.0]) - 1.0).abs() < 0.2);
        assert!((booster.predict(&[0.8, 0.0]) - 5.0).abs() < 0.2);
    }

    #[test]
    fn binary_outputs_probabilities() {
        let (matrix, labels) = step_data(400);
        let labels: Vec<f64> = labels.iter().map(|l| f64::from(*l > 3.0)).collect();
        let booster = Booster::train(&params(Objective::Binary), &matrix, &labels, None).unwrap();
        let low = booster.predict(&[0.1, 0.0]);
        let high = booster.predict(&[0.9, 0.0]);
        assert!(low < 0.2 && high > 0.8, "{low} {high}");
        assert!((0.0..=1.0).contains(&low));
    }

    #[test]
    fn early_stopping_truncates_to_best_round() {
        let (matrix, labels) = step_data(400);
        let (valid, valid_labels) = step_data(100);
        let params = BoosterParams::builder()
            .objective(Objective::L2)
            .num_leaves(4)
            .learning_rate(1.0)
            .num_boost_round(200)
            .early_stopping_rounds(3)
            .min_data_in_leaf(5)
            .build();
        let booster = Booster::train(&params, &matrix, &labels, Some((&valid, &valid_labels))).unwrap();
        let best = booster.best_iteration().unwrap();
        assert_eq!(booster.num_trees(), best);
        assert!(best < 200);
    }

    #[test]
    fn missing_values_go_left() {
        let (matrix, labels) = step_data(400);
        let booster = Booster::train(&params(Objective::L2), &matrix, &labels, None).unwrap();
        let missing = booster.predict(&[f64::NAN, 0.5]);
        assert!((missing - booster.predict(&[0.0, 0.5])).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_input() {
        let (matrix, labels) = step_data(10);
        let err = Booster::train(&params(Objective::Binary), &matrix, &labels, None).unwrap_err();
        assert!(matches!(err, ModelError::InvalidLabel(_)));
        let err = Booster::train(&params(Objective::L2), &Matrix::new(2), &[], None).unwrap_err();
        assert!(matches!(err, ModelError::EmptyTrainingSet));
        let err = Booster::train(&params(Objective::L2), &matrix, &labels[..3], None).unwrap_err();
        assert!(matches!(err, ModelError::LabelCount { .. }));
    }

    #[test]
    fn training_is_deterministic() {
        let (matrix, labels) = step_data(200);
        let params = BoosterParams::builder()
            .objective(Objective::L2)
            .feature_fraction(0.5)
            .num_boost_round(20)
            .min_data_in_leaf(5)
            .build();
        let a = Booster::train(&params, &matrix, &labels, None).unwrap();
        let b = Booster::train(&params, &matrix, &labels, None).unwrap();
        assert_eq!(a, b);
    }
}
