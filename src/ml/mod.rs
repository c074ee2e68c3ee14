//! Regression models and evaluation metrics.
//!
//! The models here are deliberately small and dependency-free: boosted
//! decision stumps for serving, closed-form ridge regression for
//! cross-validation, and a fixed-coefficient heuristic fallback.

pub mod gbdt;
pub mod heuristic;
pub mod metrics;
pub mod ridge;

use thiserror::Error;

/// Failures raised while fitting a model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainError {
    #[error("Training set is empty")]
    EmptyDataset,
    #[error("Mismatched training inputs/labels: {features} rows vs {labels} labels")]
    MismatchedLengths { features: usize, labels: usize },
    #[error("Row {row} has {found} features (expected {expected})")]
    FeatureLength {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Row {row} contains a non-finite value")]
    NonFinite { row: usize },
    #[error("Normal equations are singular")]
    Singular,
}

/// Dense row-major regression dataset.
#[derive(Debug, Clone, Default)]
pub struct RegressionDataset {
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Targets aligned with `x`.
    pub y: Vec<f32>,
}

impl RegressionDataset {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Check shape and finiteness, returning the feature width.
    pub fn validate(&self) -> Result<usize, TrainError> {
        if self.x.len() != self.y.len() {
            return Err(TrainError::MismatchedLengths {
                features: self.x.len(),
                labels: self.y.len(),
            });
        }
        let Some(first) = self.x.first() else {
            return Err(TrainError::EmptyDataset);
        };
        let width = first.len();
        for (row, (features, label)) in self.x.iter().zip(&self.y).enumerate() {
            if features.len() != width {
                return Err(TrainError::FeatureLength {
                    row,
                    expected: width,
                    found: features.len(),
                });
            }
            if !label.is_finite() || features.iter().any(|v| !v.is_finite()) {
                return Err(TrainError::NonFinite { row });
            }
        }
        Ok(width)
    }

    /// Copy the rows at `indices` into a new dataset.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }
}
