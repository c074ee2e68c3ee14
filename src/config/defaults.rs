pub(super) const MAX_BINS: usize = 256;

pub(super) fn default_rounds() -> usize {
    200
}

pub(super) fn default_learning_rate() -> f32 {
    0.15
}

pub(super) fn default_bins() -> usize {
    32
}

pub(super) fn default_min_samples_leaf() -> usize {
    10
}

pub(super) fn default_min_labeled_rows() -> usize {
    10
}

pub(super) fn default_folds() -> usize {
    5
}

pub(super) fn default_min_rows() -> usize {
    10
}

pub(super) fn default_seed() -> u64 {
    42
}

pub(super) fn default_ridge_l2() -> f64 {
    1e-3
}

pub(super) fn default_delay_threshold_days() -> f32 {
    15.0
}

pub(super) fn default_change_request_threshold() -> u32 {
    5
}

/// Neutral maximum of the 0..=10 feedback scale, standing in for "no feedback".
pub(super) fn default_missing_feedback_score() -> f64 {
    10.0
}

pub(super) fn default_top_limit() -> usize {
    5
}

pub(super) fn default_cluster_count() -> usize {
    3
}

pub(super) fn default_max_iterations() -> u64 {
    300
}

pub(super) fn default_tolerance() -> f64 {
    1e-4
}

pub(super) fn default_n_runs() -> usize {
    10
}
