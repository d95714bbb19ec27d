pub mod error;
pub mod gbdt;
pub mod metrics;
pub mod persistence;

use crate::model::error::ModelError;
use crate::model::gbdt::{Booster, BoosterParams, Matrix, Objective};
use serde::{Deserialize, Serialize};

/// Decision rule shared by every rain classification: strictly above the
/// threshold is the positive class.
pub fn exceeds_threshold(probability: f64, threshold: f64) -> bool {
    probability > threshold
}

/// Uniform prediction interface over fitted models.
pub trait Predictor {
    /// Prediction for one feature row laid out in training order.
    fn predict(&self, features: &[f64]) -> f64;

    /// Total split gain per feature, in training order.
    fn importance(&self) -> &[f64];

    fn predict_matrix(&self, matrix: &Matrix) -> Vec<f64> {
        (0..matrix.rows())
            .map(|i| self.predict(&matrix.row(i)))
            .collect()
    }
}

/// Continuous-valued model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regressor(Booster);

impl Regressor {
    pub fn fit(
        params: &BoosterParams,
        train: &Matrix,
        labels: &[f64],
        valid: Option<(&Matrix, &[f64])>,
    ) -> Result<Self, ModelError> {
        let mut params = params.clone();
        if params.objective == Objective::Binary {
            params.objective = Objective::L1;
        }
        Booster::train(&params, train, labels, valid).map(Self)
    }

    pub fn booster(&self) -> &Booster {
        &self.0
    }
}

impl Predictor for Regressor {
    fn predict(&self, features: &[f64]) -> f64 {
        self.0.predict(features)
    }

    fn importance(&self) -> &[f64] {
        self.0.feature_importance()
    }
}

/// Binary model returning the probability of the positive class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier(Booster);

impl Classifier {
    pub fn fit(
        params: &BoosterParams,
        train: &Matrix,
        labels: &[f64],
        valid: Option<(&Matrix, &[f64])>,
    ) -> Result<Self, ModelError> {
        let mut params = params.clone();
        params.objective = Objective::Binary;
        Booster::train(&params, train, labels, valid).map(Self)
    }

    pub fn booster(&self) -> &Booster {
        &self.0
    }

    pub fn predict_class(&self, features: &[f64], threshold: f64) -> bool {
        exceeds_threshold(self.predict(features), threshold)
    }
}

impl Predictor for Classifier {
    fn predict(&self, features: &[f64]) -> f64 {
        self.0.predict(features)
    }

    fn importance(&self) -> &[f64] {
        self.0.feature_importance()
    }
}

/// Either kind of fitted model, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Model {
    Regressor(Regressor),
    Classifier(Classifier),
}

impl Model {
    pub fn booster(&self) -> &Booster {
        match self {
            Model::Regressor(m) => m.booster(),
            Model::Classifier(m) => m.booster(),
        }
    }
}

impl Predictor for Model {
    fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Model::Regressor(m) => m.predict(features),
            Model::Classifier(m) => m.predict(features),
        }
    }

    fn importance(&self) -> &[f64] {
        match self {
            Model::Regressor(m) => m.importance(),
            Model::Classifier(m) => m.importance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_forces_binary_objective() {
        let rows: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..60).map(|i| f64::from(i >= 30)).collect();
        let matrix = Matrix::from_rows(1, &rows).unwrap();
        let params = BoosterParams::builder()
            .objective(Objective::L1)
            .num_boost_round(30)
            .min_data_in_leaf(5)
            .build();

        let model = Model::Classifier(Classifier::fit(&params, &matrix, &labels, None).unwrap());
        assert_eq!(model.booster().objective(), Objective::Binary);
        let p = model.predict(&[50.0]);
        assert!(p > 0.5 && p <= 1.0);
        assert_eq!(model.predict_matrix(&matrix).len(), 60);
    }

    #[test]
    fn class_decision_is_strictly_above_the_threshold() {
        assert!(!exceeds_threshold(0.25, 0.25));
        assert!(exceeds_threshold(0.2501, 0.25));
        assert!(!exceeds_threshold(f64::NAN, 0.25));

        let rows: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..60).map(|i| f64::from(i >= 30)).collect();
        let matrix = Matrix::from_rows(1, &rows).unwrap();
        let params = BoosterParams::builder().num_boost_round(30).min_data_in_leaf(5).build();
        let classifier = Classifier::fit(&params, &matrix, &labels, None).unwrap();
        let p = classifier.predict(&[50.0]);
        assert_eq!(classifier.predict_class(&[50.0], 0.25), exceeds_threshold(p, 0.25));
        assert!(!classifier.predict_class(&[50.0], 1.0));
    }
}
