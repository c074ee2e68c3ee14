//! Delay model artifacts and how they are fitted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{SparseFallback, TrainingSettings};
use crate::features::FeatureRow;
use crate::ml::gbdt::{BoostOptions, GbdtRegressionModel, train_gbdt_regressor};
use crate::ml::heuristic::heuristic_delay;
use crate::ml::{RegressionDataset, TrainError};

/// Which kind of model is currently serving predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    BoostedStumps,
    LabelEcho,
    Heuristic,
}

/// A fitted delay predictor.
#[derive(Debug, Clone, PartialEq)]
pub enum DelayModel {
    /// Gradient-boosted stumps over the full feature vector.
    Boosted(GbdtRegressionModel),
    /// Sparse-data fallback returning the row's own label, or zero.
    LabelEcho,
    /// Sparse-data fallback using fixed coefficients.
    Heuristic,
}

impl DelayModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            DelayModel::Boosted(_) => ModelKind::BoostedStumps,
            DelayModel::LabelEcho => ModelKind::LabelEcho,
            DelayModel::Heuristic => ModelKind::Heuristic,
        }
    }

    /// Predicted delay in days. Negative values mean an early finish.
    pub fn predict(&self, row: &FeatureRow) -> f32 {
        match self {
            DelayModel::Boosted(model) => model.predict(&row.to_vector()),
            DelayModel::LabelEcho => row.label_or_zero(),
            DelayModel::Heuristic => heuristic_delay(row),
        }
    }
}

/// The model held by the service together with what it was fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub model: DelayModel,
    /// Labeled rows available at fit time.
    pub labeled_rows: usize,
}

/// Snapshot of the service's model state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub trained: bool,
    pub kind: Option<ModelKind>,
    pub labeled_rows: usize,
}

impl ModelStatus {
    pub(crate) fn of(model: Option<&TrainedModel>) -> Self {
        match model {
            Some(model) => Self {
                trained: true,
                kind: Some(model.model.kind()),
                labeled_rows: model.labeled_rows,
            },
            None => Self {
                trained: false,
                kind: None,
                labeled_rows: 0,
            },
        }
    }
}

/// Cooperative cancellation flag for training.
///
/// Checked before the project query and again before fitting; a fit that has
/// started always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl From<&TrainingSettings> for BoostOptions {
    fn from(settings: &TrainingSettings) -> Self {
        Self {
            rounds: settings.rounds,
            learning_rate: settings.learning_rate,
            bins: settings.bins,
            min_samples_leaf: settings.min_samples_leaf,
        }
    }
}

/// Fit a delay model on the labeled subset of `rows`.
///
/// Below `min_labeled_rows` the configured sparse fallback is installed
/// instead; the returned count is always the number of labeled rows seen.
pub fn fit_delay_model(
    rows: &[FeatureRow],
    settings: &TrainingSettings,
) -> Result<TrainedModel, TrainError> {
    let labeled: Vec<(&FeatureRow, f32)> = rows
        .iter()
        .filter_map(|row| row.label_delay_days.map(|label| (row, label)))
        .collect();
    let labeled_rows = labeled.len();

    if labeled_rows < settings.min_labeled_rows {
        warn!(
            labeled_rows,
            required = settings.min_labeled_rows,
            fallback = ?settings.sparse_fallback,
            "Too few completed projects to train; installing fallback"
        );
        let model = match settings.sparse_fallback {
            SparseFallback::LabelEcho => DelayModel::LabelEcho,
            SparseFallback::Heuristic => DelayModel::Heuristic,
        };
        return Ok(TrainedModel {
            model,
            labeled_rows,
        });
    }

    let dataset = RegressionDataset {
        x: labeled
            .iter()
            .map(|(row, _)| row.to_vector().to_vec())
            .collect(),
        y: labeled.iter().map(|&(_, label)| label).collect(),
    };
    let boosted = train_gbdt_regressor(&dataset, &BoostOptions::from(settings))?;
    info!(
        labeled_rows,
        stumps = boosted.stumps.len(),
        init_value = boosted.init_value,
        "Trained delay model"
    );
    Ok(TrainedModel {
        model: DelayModel::Boosted(boosted),
        labeled_rows,
    })
}
