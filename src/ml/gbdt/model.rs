use serde::{Deserialize, Serialize};
use std::path::Path;

/// Single-split regression tree used as a weak learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionStump {
    /// Feature index used for the split.
    pub feature_index: u16,
    /// Threshold in feature units.
    pub threshold: f32,
    /// Residual estimate for `feature <= threshold`.
    pub left_value: f32,
    /// Residual estimate for `feature > threshold`.
    pub right_value: f32,
}

impl RegressionStump {
    /// Predict the stump value for a feature vector.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let idx = self.feature_index as usize;
        let value = features.get(idx).copied().unwrap_or(0.0);
        if value <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Gradient-boosted stump model predicting a delay in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtRegressionModel {
    /// Model format version.
    pub model_version: i64,
    /// Number of `f32` values per feature vector.
    pub feature_len: usize,
    /// Learning rate applied to each stump prediction.
    pub learning_rate: f32,
    /// Prediction before any boosting round (mean training label).
    pub init_value: f32,
    /// One stump per completed round.
    pub stumps: Vec<RegressionStump>,
}

impl GbdtRegressionModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_len == 0 {
            return Err("Model must use at least one feature".to_string());
        }
        if !self.init_value.is_finite() || !self.learning_rate.is_finite() {
            return Err("Model parameters must be finite".to_string());
        }
        for (idx, stump) in self.stumps.iter().enumerate() {
            if stump.feature_index as usize >= self.feature_len {
                return Err(format!(
                    "Stump {idx} splits on feature {} but the model has {}",
                    stump.feature_index, self.feature_len
                ));
            }
        }
        Ok(())
    }

    /// Load a model from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, String> {
        let bytes = std::fs::read(path).map_err(|err| err.to_string())?;
        let model: Self = serde_json::from_slice(&bytes).map_err(|err| err.to_string())?;
        model.validate()?;
        Ok(model)
    }

    /// Write the model as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<(), String> {
        let data = serde_json::to_vec_pretty(self).map_err(|err| err.to_string())?;
        std::fs::write(path, data).map_err(|err| format!("Write model failed: {err}"))
    }

    /// Predict the target for a feature vector.
    pub fn predict(&self, features: &[f32]) -> f32 {
        self.stumps.iter().fold(self.init_value, |acc, stump| {
            acc + self.learning_rate * stump.predict(features)
        })
    }
}
