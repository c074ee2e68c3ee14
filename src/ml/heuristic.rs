//! Fixed-coefficient delay estimate for when too little history exists to train.

use crate::features::FeatureRow;

const LENGTH_WEIGHT: f64 = 0.08;
const PRICE_WEIGHT: f64 = 0.000_001_5;
const TASK_WEIGHT: f64 = 0.06;
const CHANGE_REQUEST_WEIGHT: f64 = 4.5;
const INTERACTION_WEIGHT: f64 = -0.25;

/// Linear rule of thumb over yacht size and project activity.
///
/// The result is not clamped; heavy client contact can push it below zero.
pub fn heuristic_delay(row: &FeatureRow) -> f32 {
    let estimate = LENGTH_WEIGHT * row.length_m as f64
        + PRICE_WEIGHT * row.base_price as f64
        + TASK_WEIGHT * row.task_count as f64
        + CHANGE_REQUEST_WEIGHT * row.change_request_count as f64
        + INTERACTION_WEIGHT * row.interaction_count as f64;
    estimate as f32
}
