//! K-means grouping of projects for the risk dashboard.

use linfa::DatasetBase;
use linfa::traits::{Fit, Predict};
use linfa_clustering::KMeans;
use ndarray::{Array1, Array2};
use serde::Serialize;
use tracing::debug;

use super::PredictionError;
use super::risk::RiskRecord;
use crate::config::ClusteringSettings;

/// Cluster membership of one project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    pub project_id: i64,
    /// 0-based; numbered in order of first appearance within one call.
    pub cluster_label: usize,
    pub predicted_delay: f32,
    pub change_request_count: u32,
    pub feedback_score: f64,
}

/// Partition records into at most `k` clusters over
/// (predicted delay, change requests, feedback score).
///
/// When there are no more distinct points than `k`, each distinct point is
/// its own cluster and k-means is skipped.
pub fn assign_clusters(
    records: &[RiskRecord],
    k: usize,
    settings: &ClusteringSettings,
) -> Result<Vec<ClusterAssignment>, PredictionError> {
    if k == 0 {
        return Err(PredictionError::InvalidRequest(
            "cluster count must be at least 1".into(),
        ));
    }
    if records.is_empty() {
        return Ok(Vec::new());
    }
    let points: Vec<[f64; 3]> = records.iter().map(point).collect();

    let raw_labels = if distinct_count(&points) <= k {
        debug!(points = points.len(), k, "Few distinct points; skipping k-means");
        label_distinct(&points)
    } else {
        fit_kmeans(&points, k, settings)?
    };

    let labels = relabel_by_first_seen(&raw_labels);
    Ok(records
        .iter()
        .zip(labels)
        .map(|(record, cluster_label)| ClusterAssignment {
            project_id: record.project_id,
            cluster_label,
            predicted_delay: record.predicted_delay,
            change_request_count: record.change_request_count,
            feedback_score: record.feedback_score,
        })
        .collect())
}

fn point(record: &RiskRecord) -> [f64; 3] {
    [
        record.predicted_delay as f64,
        record.change_request_count as f64,
        record.feedback_score,
    ]
}

fn distinct_count(points: &[[f64; 3]]) -> usize {
    label_distinct(points).into_iter().max().map_or(0, |m| m + 1)
}

/// Identical points share a label; labels follow first appearance.
fn label_distinct(points: &[[f64; 3]]) -> Vec<usize> {
    let mut seen: Vec<[f64; 3]> = Vec::new();
    points
        .iter()
        .map(|p| match seen.iter().position(|s| s == p) {
            Some(idx) => idx,
            None => {
                seen.push(*p);
                seen.len() - 1
            }
        })
        .collect()
}

fn fit_kmeans(
    points: &[[f64; 3]],
    k: usize,
    settings: &ClusteringSettings,
) -> Result<Vec<usize>, PredictionError> {
    let flat: Vec<f64> = points.iter().flatten().copied().collect();
    let observations = Array2::from_shape_vec((points.len(), 3), flat)
        .map_err(|err| PredictionError::Clustering(err.to_string()))?;
    let dataset = DatasetBase::from(observations.clone());
    let model = KMeans::params(k)
        .max_n_iterations(settings.max_iterations)
        .tolerance(settings.tolerance)
        .n_runs(settings.n_runs.max(1))
        .fit(&dataset)
        .map_err(|err| PredictionError::Clustering(err.to_string()))?;
    let labels: Array1<usize> = model.predict(&observations);
    Ok(labels.to_vec())
}

fn relabel_by_first_seen(labels: &[usize]) -> Vec<usize> {
    let mut mapping: Vec<(usize, usize)> = Vec::new();
    labels
        .iter()
        .map(|&label| match mapping.iter().find(|(raw, _)| *raw == label) {
            Some(&(_, mapped)) => mapped,
            None => {
                let mapped = mapping.len();
                mapping.push((label, mapped));
                mapped
            }
        })
        .collect()
}
