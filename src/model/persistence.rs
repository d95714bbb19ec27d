use crate::features::frame::FeatureFrame;
use crate::forecast::target::Target;
use crate::model::error::ModelError;
use crate::model::{Model, Predictor};
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::info;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// A fitted model bound to the ordered feature names it was trained on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    target: Target,
    feature_names: Vec<String>,
    model: Model,
}

impl TrainedModel {
    pub fn new(target: Target, feature_names: Vec<String>, model: Model) -> Self {
        Self {
            target,
            feature_names,
            model,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Column positions of this model's features in `frame`. Features the
    /// frame lacks are read as 0 by [`TrainedModel::predict_row`].
    pub fn align(&self, frame: &FeatureFrame) -> Vec<Option<usize>> {
        frame.projection(&self.feature_names)
    }

    /// Raw model output for `row` of `frame`, given `align(frame)`.
    pub fn predict_row(&self, frame: &FeatureFrame, row: usize, alignment: &[Option<usize>]) -> f64 {
        self.model.predict(&frame.projected_row(row, alignment))
    }

    /// [`TrainedModel::predict_row`] clamped to the target's valid range.
    pub fn forecast_row(&self, frame: &FeatureFrame, row: usize, alignment: &[Option<usize>]) -> f64 {
        self.target.clamp_prediction(self.predict_row(frame, row, alignment))
    }

    /// Features ordered by total split gain, highest first.
    pub fn importances(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.model.importance().iter().copied())
            .collect();
        pairs.sort_by_key(|(_, gain)| std::cmp::Reverse(OrderedFloat(*gain)));
        pairs
    }

    pub async fn save(&self, path: &Path) -> Result<(), ModelError> {
        let bytes = tokio::task::spawn_blocking({
            let model = self.clone();
            let path = path.to_path_buf();
            move || {
                bincode::serde::encode_to_vec(&model, BINCODE_CONFIG)
                    .map_err(|e| ModelError::Encode(path, Box::new(e)))
            }
        })
        .await??;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ModelError::Write(parent.to_path_buf(), e))?;
        }
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| ModelError::Write(path.to_path_buf(), e))?;
        info!(
            "Saved {} model ({} bytes) to {}",
            self.target,
            bytes.len(),
            path.display()
        );
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ModelError::Read(path.to_path_buf(), e))?;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            bincode::serde::decode_from_slice::<TrainedModel, _>(&bytes, BINCODE_CONFIG)
                .map(|(model, _)| model)
                .map_err(|e| ModelError::Decode(path, Box::new(e)))
        })
        .await?
    }
}
