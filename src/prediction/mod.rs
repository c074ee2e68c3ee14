//! Delay prediction service over a project feed.
//!
//! [`PredictionService`] owns the single trained model for the process. The
//! first prediction trains synchronously; later calls clone the held
//! `Arc<TrainedModel>` under a brief read lock and score outside it. Explicit
//! retraining fits without holding the model lock and swaps the result in
//! atomically, so readers see either the old model or the new one.

mod clustering;
mod error;
mod evaluate;
mod model;
mod risk;

pub use clustering::{ClusterAssignment, assign_clusters};
pub use error::PredictionError;
pub use evaluate::{
    CrossValidationReport, FeatureImportance, FeatureImportanceReport, FoldMetrics,
    cross_validate_rows, feature_importance_rows,
};
pub use model::{
    CancelToken, DelayModel, ModelKind, ModelStatus, TrainedModel, fit_delay_model,
};
pub use risk::{DelayRanking, RiskRecord, rank_high_risk, rank_top_delays};

use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::PredictionConfig;
use crate::features::{self, FeatureRow, ProjectAggregate};
use crate::store::ProjectFeed;

/// Prediction for one stored project.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectPrediction {
    pub project_id: i64,
    pub project_name: String,
    /// Rounded to one decimal place.
    pub predicted_delay_days: f32,
}

/// Trains, holds and serves the delay model for one project feed.
pub struct PredictionService {
    feed: Arc<dyn ProjectFeed>,
    config: PredictionConfig,
    model: RwLock<Option<Arc<TrainedModel>>>,
    training_gate: Mutex<()>,
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PredictionService {
    /// Create an untrained service. Config values are normalized first.
    pub fn new(feed: Arc<dyn ProjectFeed>, config: PredictionConfig) -> Self {
        Self {
            feed,
            config: config.normalized(),
            model: RwLock::new(None),
            training_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Fit a fresh model from the feed and install it.
    ///
    /// Returns the number of labeled projects seen. On failure the previously
    /// held model stays in place.
    pub fn train(&self, cancel: &CancelToken) -> Result<usize, PredictionError> {
        let _gate = self
            .training_gate
            .lock()
            .map_err(|_| PredictionError::LockPoisoned)?;
        Ok(self.fit_and_install(cancel)?.labeled_rows)
    }

    /// Current model state without triggering training.
    pub fn status(&self) -> Result<ModelStatus, PredictionError> {
        Ok(ModelStatus::of(self.held_model()?.as_deref()))
    }

    /// Predict a delay from raw yacht and activity values.
    pub fn predict_delay(
        &self,
        length_m: f32,
        base_price: f32,
        task_count: u32,
        change_request_count: u32,
        interaction_count: u32,
    ) -> Result<f32, PredictionError> {
        let row = FeatureRow::from_counts(
            length_m,
            base_price,
            task_count,
            change_request_count,
            interaction_count,
        );
        self.predict_row(&row)
    }

    /// Predict the delay of a stored project.
    pub fn predict_project(&self, project_id: i64) -> Result<ProjectPrediction, PredictionError> {
        let project = self
            .feed
            .project_aggregate(project_id)?
            .ok_or(PredictionError::NotFound(project_id))?;
        let predicted = self.predict_row(&features::extract(&project))?;
        Ok(ProjectPrediction {
            project_id,
            project_name: project.name,
            predicted_delay_days: round_tenths(predicted),
        })
    }

    /// Score one feature row with the held model, training first if needed.
    pub fn predict_row(&self, row: &FeatureRow) -> Result<f32, PredictionError> {
        Ok(self.current_model()?.model.predict(row))
    }

    /// Cross-validate the linear pipeline over every project row.
    pub fn cross_validate(&self, folds: usize) -> Result<CrossValidationReport, PredictionError> {
        if folds < 2 {
            return Err(PredictionError::InvalidRequest(format!(
                "cross-validation needs at least 2 folds, got {folds}"
            )));
        }
        let rows = features::extract_all(&self.feed.project_aggregates()?);
        let report = cross_validate_rows(&rows, folds, &self.config.evaluation)?;
        info!(
            folds = report.folds.len(),
            row_count = report.row_count,
            mean_mae = report.mean_mae,
            mean_rmse = report.mean_rmse,
            mean_r2 = report.mean_r2,
            "Cross-validation finished"
        );
        Ok(report)
    }

    /// Rank feature columns by absolute correlation with the delay label.
    pub fn feature_importance(&self) -> Result<FeatureImportanceReport, PredictionError> {
        let rows = features::extract_all(&self.feed.project_aggregates()?);
        let report = feature_importance_rows(&rows, &self.config.evaluation);
        info!(
            row_count = report.row_count,
            items = report.items.len(),
            "Feature importance computed"
        );
        Ok(report)
    }

    /// Active projects whose predicted delay and change requests both exceed
    /// the configured thresholds, worst first.
    pub fn high_risk_projects(&self) -> Result<Vec<RiskRecord>, PredictionError> {
        let projects = self.feed.project_aggregates()?;
        let active: Vec<&ProjectAggregate> = projects.iter().filter(|p| p.is_active()).collect();
        let records = self.risk_records(active)?;
        let ranked = rank_high_risk(records, &self.config.risk);
        info!(high_risk = ranked.len(), "High-risk projects ranked");
        Ok(ranked)
    }

    /// Cluster every project by (predicted delay, change requests, feedback).
    ///
    /// Each call fits a fresh k-means model.
    pub fn run_clustering(&self, k: usize) -> Result<Vec<ClusterAssignment>, PredictionError> {
        if k == 0 {
            return Err(PredictionError::InvalidRequest(
                "cluster count must be at least 1".into(),
            ));
        }
        let projects = self.feed.project_aggregates()?;
        let records = self.risk_records(projects.iter().collect())?;
        let assignments = assign_clusters(&records, k, &self.config.clustering)?;
        info!(
            k,
            projects = assignments.len(),
            "Clustering finished"
        );
        Ok(assignments)
    }

    /// Projects with a yacht model, ordered by predicted delay.
    pub fn top_predicted_delays(&self, limit: usize) -> Result<Vec<DelayRanking>, PredictionError> {
        let projects = self.feed.project_aggregates()?;
        let model = self.current_model()?;
        let rankings = projects
            .iter()
            .filter_map(|project| {
                let yacht = project.yacht?;
                let row = features::extract(project);
                Some(DelayRanking {
                    project_id: project.project_id,
                    project_name: project.name.clone(),
                    customer_name: project.customer_name.clone(),
                    predicted_delay: model.model.predict(&row),
                    change_request_count: project.change_request_count,
                    task_count: project.task_count,
                    length_m: yacht.length_m,
                })
            })
            .collect();
        Ok(rank_top_delays(rankings, limit))
    }

    fn risk_records(
        &self,
        projects: Vec<&ProjectAggregate>,
    ) -> Result<Vec<RiskRecord>, PredictionError> {
        let feedback = self.feed.feedback_averages()?;
        let model = self.current_model()?;
        let missing = self.config.risk.missing_feedback_score;
        Ok(projects
            .into_iter()
            .map(|project| {
                let row = features::extract(project);
                RiskRecord {
                    project_id: project.project_id,
                    project_name: project.name.clone(),
                    customer_name: project.customer_name.clone(),
                    predicted_delay: model.model.predict(&row),
                    change_request_count: project.change_request_count,
                    feedback_score: feedback
                        .get(&project.project_id)
                        .copied()
                        .unwrap_or(missing),
                }
            })
            .collect())
    }

    /// The installed model, if any, without triggering training.
    pub fn held_model(&self) -> Result<Option<Arc<TrainedModel>>, PredictionError> {
        let guard = self.model.read().map_err(|_| PredictionError::LockPoisoned)?;
        Ok(guard.clone())
    }

    /// Held model, training once under the gate when none exists yet.
    fn current_model(&self) -> Result<Arc<TrainedModel>, PredictionError> {
        if let Some(model) = self.held_model()? {
            return Ok(model);
        }
        let _gate = self
            .training_gate
            .lock()
            .map_err(|_| PredictionError::LockPoisoned)?;
        if let Some(model) = self.held_model()? {
            return Ok(model);
        }
        debug!("No model held; training on first use");
        self.fit_and_install(&CancelToken::new())
    }

    /// Caller must hold the training gate.
    fn fit_and_install(&self, cancel: &CancelToken) -> Result<Arc<TrainedModel>, PredictionError> {
        if cancel.is_cancelled() {
            return Err(PredictionError::Cancelled);
        }
        let projects = self.feed.project_aggregates()?;
        let rows = features::extract_all(&projects);
        if cancel.is_cancelled() {
            return Err(PredictionError::Cancelled);
        }
        let trained = Arc::new(fit_delay_model(&rows, &self.config.training)?);
        let mut slot = self
            .model
            .write()
            .map_err(|_| PredictionError::LockPoisoned)?;
        *slot = Some(Arc::clone(&trained));
        info!(
            projects = rows.len(),
            labeled_rows = trained.labeled_rows,
            kind = ?trained.model.kind(),
            "Installed delay model"
        );
        Ok(trained)
    }
}

fn round_tenths(value: f32) -> f32 {
    ((value as f64 * 10.0).round() / 10.0) as f32
}

#[cfg(test)]
mod tests;
