//! K-fold cross-validation and correlation-based feature importance.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;

use crate::config::{EvaluationSettings, UnlabeledRows};
use crate::features::{FEATURE_COLUMNS, FeatureRow};
use crate::ml::metrics::{pearson_abs, regression_metrics};
use crate::ml::ridge::train_ridge;
use crate::ml::{RegressionDataset, TrainError};

const MODEL_DESCRIPTION: &str = "boosted stumps (serving), ridge (cross-validation)";
const IMPORTANCE_METHOD: &str = "absolute pearson correlation";

/// Held-out metrics for one fold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldMetrics {
    /// 1-based fold number.
    pub fold: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// Cross-validation result. Zero folds means there was not enough data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationReport {
    pub folds: Vec<FoldMetrics>,
    pub mean_mae: f64,
    pub mean_rmse: f64,
    pub mean_r2: f64,
    /// Usable rows after the unlabeled-row policy was applied.
    pub row_count: usize,
    pub model: &'static str,
}

impl CrossValidationReport {
    fn insufficient(row_count: usize) -> Self {
        Self {
            folds: Vec::new(),
            mean_mae: 0.0,
            mean_rmse: 0.0,
            mean_r2: 0.0,
            row_count,
            model: MODEL_DESCRIPTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature_name: &'static str,
    /// In `[0, 1]`.
    pub abs_correlation: f64,
}

/// Importance scores, highest first. Empty when there was not enough data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportanceReport {
    pub items: Vec<FeatureImportance>,
    pub row_count: usize,
    pub method: &'static str,
}

/// Apply the unlabeled-row policy, returning feature vectors and labels.
fn usable_rows(rows: &[FeatureRow], policy: UnlabeledRows) -> RegressionDataset {
    let mut dataset = RegressionDataset::default();
    for row in rows {
        let label = match (row.label_delay_days, policy) {
            (Some(label), _) => label,
            (None, UnlabeledRows::ZeroFill) => 0.0,
            (None, UnlabeledRows::Exclude) => continue,
        };
        dataset.x.push(row.to_vector().to_vec());
        dataset.y.push(label);
    }
    dataset
}

/// Shuffle indices with a seeded RNG and deal them round-robin into `folds` groups.
fn fold_indices(n: usize, folds: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let mut groups = vec![Vec::with_capacity(n / folds + 1); folds];
    for (pos, idx) in indices.into_iter().enumerate() {
        groups[pos % folds].push(idx);
    }
    groups
}

/// Cross-validate a ridge pipeline over `rows`.
///
/// Returns a zero-fold report when fewer than `max(min_rows, folds)` rows are
/// usable. `folds` must be at least 2.
pub fn cross_validate_rows(
    rows: &[FeatureRow],
    folds: usize,
    settings: &EvaluationSettings,
) -> Result<CrossValidationReport, TrainError> {
    let dataset = usable_rows(rows, settings.unlabeled_rows);
    let row_count = dataset.len();
    if folds < 2 || row_count < settings.min_rows.max(folds) {
        debug!(row_count, folds, "Not enough rows to cross-validate");
        return Ok(CrossValidationReport::insufficient(row_count));
    }
    dataset.validate()?;

    let groups = fold_indices(row_count, folds, settings.seed);
    let mut results = Vec::with_capacity(folds);
    for (fold, test_idx) in groups.iter().enumerate() {
        let train_idx: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|&(other, _)| other != fold)
            .flat_map(|(_, idx)| idx.iter().copied())
            .collect();
        let model = train_ridge(&dataset.subset(&train_idx), settings.ridge_l2)?;
        let test = dataset.subset(test_idx);
        let predicted: Vec<f32> = test.x.iter().map(|x| model.predict(x)).collect();
        let metrics = regression_metrics(&test.y, &predicted);
        debug!(
            fold = fold + 1,
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            "Fold evaluated"
        );
        results.push(FoldMetrics {
            fold: fold + 1,
            train_rows: train_idx.len(),
            test_rows: test_idx.len(),
            mae: metrics.mae,
            rmse: metrics.rmse,
            r2: metrics.r2,
        });
    }

    let mean = |f: fn(&FoldMetrics) -> f64| results.iter().map(f).sum::<f64>() / folds as f64;
    Ok(CrossValidationReport {
        mean_mae: mean(|m| m.mae),
        mean_rmse: mean(|m| m.rmse),
        mean_r2: mean(|m| m.r2),
        folds: results,
        row_count,
        model: MODEL_DESCRIPTION,
    })
}

/// Score every feature column by its absolute correlation with the label.
pub fn feature_importance_rows(
    rows: &[FeatureRow],
    settings: &EvaluationSettings,
) -> FeatureImportanceReport {
    let dataset = usable_rows(rows, settings.unlabeled_rows);
    let row_count = dataset.len();
    if row_count < settings.min_rows {
        return FeatureImportanceReport {
            items: Vec::new(),
            row_count,
            method: IMPORTANCE_METHOD,
        };
    }
    let mut items: Vec<FeatureImportance> = FEATURE_COLUMNS
        .iter()
        .enumerate()
        .map(|(j, column)| {
            let values: Vec<f32> = dataset.x.iter().map(|x| x[j]).collect();
            FeatureImportance {
                feature_name: column.name,
                abs_correlation: pearson_abs(&values, &dataset.y),
            }
        })
        .collect();
    items.sort_by(|a, b| b.abs_correlation.total_cmp(&a.abs_correlation));
    FeatureImportanceReport {
        items,
        row_count,
        method: IMPORTANCE_METHOD,
    }
}
