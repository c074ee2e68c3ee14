use std::cmp::Ordering;

use serde::Serialize;

use crate::config::RiskSettings;

/// One project scored for the risk dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRecord {
    pub project_id: i64,
    pub project_name: String,
    pub customer_name: String,
    pub predicted_delay: f32,
    pub change_request_count: u32,
    /// Average customer feedback, or the configured placeholder when none exists.
    pub feedback_score: f64,
}

/// Row of the top-delays table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DelayRanking {
    pub project_id: i64,
    pub project_name: String,
    pub customer_name: String,
    pub predicted_delay: f32,
    pub change_request_count: u32,
    pub task_count: u32,
    pub length_m: f32,
}

/// Keep records over both thresholds, sorted by delay then change requests, descending.
pub fn rank_high_risk(records: Vec<RiskRecord>, settings: &RiskSettings) -> Vec<RiskRecord> {
    let mut kept: Vec<RiskRecord> = records
        .into_iter()
        .filter(|r| {
            r.predicted_delay > settings.delay_threshold_days
                && r.change_request_count > settings.change_request_threshold
        })
        .collect();
    kept.sort_by(|a, b| {
        by_delay_then_changes(
            (a.predicted_delay, a.change_request_count),
            (b.predicted_delay, b.change_request_count),
        )
    });
    kept
}

/// Sort by delay then change requests, descending, and keep the first `limit`.
pub fn rank_top_delays(mut rankings: Vec<DelayRanking>, limit: usize) -> Vec<DelayRanking> {
    rankings.sort_by(|a, b| {
        by_delay_then_changes(
            (a.predicted_delay, a.change_request_count),
            (b.predicted_delay, b.change_request_count),
        )
    });
    rankings.truncate(limit);
    rankings
}

fn by_delay_then_changes(a: (f32, u32), b: (f32, u32)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| b.1.cmp(&a.1))
}
