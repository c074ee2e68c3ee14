use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::{
    MAX_BINS, default_bins, default_change_request_threshold, default_cluster_count,
    default_delay_threshold_days, default_folds, default_learning_rate, default_max_iterations,
    default_min_labeled_rows, default_min_rows, default_min_samples_leaf,
    default_missing_feedback_score, default_n_runs, default_ridge_l2, default_rounds,
    default_seed, default_tolerance, default_top_limit,
};

/// Root of `config.toml`.
///
/// Config keys (TOML): `database_path`, `training`, `evaluation`, `risk`, `clustering`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionConfig {
    /// Project database; defaults to `yachtcrm.db` in the app root.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub evaluation: EvaluationSettings,
    #[serde(default)]
    pub risk: RiskSettings,
    #[serde(default)]
    pub clustering: ClusteringSettings,
}

impl PredictionConfig {
    /// Clamp values that would make training or evaluation meaningless.
    pub fn normalized(self) -> Self {
        Self {
            database_path: self.database_path,
            training: self.training.normalized(),
            evaluation: self.evaluation.normalized(),
            risk: self.risk,
            clustering: self.clustering.normalized(),
        }
    }
}

/// What the regressor installs when too few labeled projects exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparseFallback {
    /// Echo the row's own label, or zero when it has none.
    #[default]
    LabelEcho,
    /// Fixed-coefficient linear estimate from the yacht spec and counts.
    Heuristic,
}

/// How evaluation treats projects without an actual completion date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlabeledRows {
    /// Count them with a zero-day delay label.
    #[default]
    ZeroFill,
    /// Leave them out of evaluation entirely.
    Exclude,
}

/// Gradient boosting parameters for the serving model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default = "default_rounds")]
    pub rounds: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f32,
    /// Histogram bins used for split search.
    #[serde(default = "default_bins")]
    pub bins: usize,
    /// Smallest number of rows allowed on either side of a split.
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    /// Labeled rows required before real fitting replaces the fallback.
    #[serde(default = "default_min_labeled_rows")]
    pub min_labeled_rows: usize,
    #[serde(default)]
    pub sparse_fallback: SparseFallback,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            learning_rate: default_learning_rate(),
            bins: default_bins(),
            min_samples_leaf: default_min_samples_leaf(),
            min_labeled_rows: default_min_labeled_rows(),
            sparse_fallback: SparseFallback::default(),
        }
    }
}

impl TrainingSettings {
    fn normalized(self) -> Self {
        let learning_rate = if self.learning_rate.is_finite() && self.learning_rate > 0.0 {
            self.learning_rate
        } else {
            default_learning_rate()
        };
        Self {
            learning_rate,
            bins: self.bins.clamp(2, MAX_BINS),
            min_samples_leaf: self.min_samples_leaf.max(1),
            ..self
        }
    }
}

/// Cross-validation and feature importance parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSettings {
    #[serde(default = "default_folds")]
    pub folds: usize,
    /// Floor below which evaluation reports insufficient data.
    #[serde(default = "default_min_rows")]
    pub min_rows: usize,
    #[serde(default)]
    pub unlabeled_rows: UnlabeledRows,
    /// Seed for the fold shuffle.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_ridge_l2")]
    pub ridge_l2: f64,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            folds: default_folds(),
            min_rows: default_min_rows(),
            unlabeled_rows: UnlabeledRows::default(),
            seed: default_seed(),
            ridge_l2: default_ridge_l2(),
        }
    }
}

impl EvaluationSettings {
    fn normalized(self) -> Self {
        let ridge_l2 = if self.ridge_l2.is_finite() && self.ridge_l2 >= 0.0 {
            self.ridge_l2
        } else {
            default_ridge_l2()
        };
        Self {
            folds: self.folds.max(2),
            ridge_l2,
            ..self
        }
    }
}

/// Thresholds for the high-risk report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSettings {
    /// Predicted delay must exceed this many days.
    #[serde(default = "default_delay_threshold_days")]
    pub delay_threshold_days: f32,
    /// Change-request count must exceed this value.
    #[serde(default = "default_change_request_threshold")]
    pub change_request_threshold: u32,
    /// Score used for projects without any feedback rows.
    #[serde(default = "default_missing_feedback_score")]
    pub missing_feedback_score: f64,
    /// Rows returned by the top-delays ranking.
    #[serde(default = "default_top_limit")]
    pub top_limit: usize,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            delay_threshold_days: default_delay_threshold_days(),
            change_request_threshold: default_change_request_threshold(),
            missing_feedback_score: default_missing_feedback_score(),
            top_limit: default_top_limit(),
        }
    }
}

/// K-means parameters for the risk dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringSettings {
    #[serde(default = "default_cluster_count")]
    pub k: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Independent k-means restarts; the best inertia wins.
    #[serde(default = "default_n_runs")]
    pub n_runs: usize,
}

impl Default for ClusteringSettings {
    fn default() -> Self {
        Self {
            k: default_cluster_count(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            n_runs: default_n_runs(),
        }
    }
}

impl ClusteringSettings {
    fn normalized(self) -> Self {
        let tolerance = if self.tolerance.is_finite() && self.tolerance > 0.0 {
            self.tolerance
        } else {
            default_tolerance()
        };
        Self {
            k: self.k.max(1),
            max_iterations: self.max_iterations.max(1),
            tolerance,
            n_runs: self.n_runs.max(1),
        }
    }
}
