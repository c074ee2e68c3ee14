//! Deterministic gradient-boosted decision-stump regressor.
//!
//! Squared-error boosting over single-split trees:
//! - Mean-label initialisation, then one stump per round fitted to residuals.
//! - Histogram split search with a minimum leaf size.
//! - Reproducible JSON model export/load.

mod model;
mod train;

pub use model::{GbdtRegressionModel, RegressionStump};
pub use train::{BoostOptions, train_gbdt_regressor};
