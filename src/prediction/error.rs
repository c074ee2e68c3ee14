use thiserror::Error;

use crate::ml::TrainError;
use crate::store::StoreError;

/// Errors surfaced by [`super::PredictionService`].
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Reading the project feed failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Fitting a model failed; any previously held model is unchanged.
    #[error("Model training failed: {0}")]
    Training(#[from] TrainError),
    /// The requested project does not exist.
    #[error("Project {0} not found")]
    NotFound(i64),
    /// Caller supplied a parameter the operation cannot honour.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Training was cancelled before fitting started.
    #[error("Training cancelled")]
    Cancelled,
    /// The clustering backend rejected the input.
    #[error("Clustering failed: {0}")]
    Clustering(String),
    /// A thread panicked while holding the model lock.
    #[error("Model lock poisoned")]
    LockPoisoned,
}
