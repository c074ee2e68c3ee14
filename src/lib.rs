//! Delay prediction for a yacht-building CRM.
//!
//! Projects are read from the CRM database through [`store::ProjectFeed`],
//! turned into fixed-width rows by [`features`], and served by
//! [`prediction::PredictionService`], which also produces the evaluation and
//! risk-dashboard reports.

/// Application directory helpers.
pub mod app_dirs;
/// TOML configuration.
pub mod config;
/// Project feature extraction.
pub mod features;
/// Tracing setup.
pub mod logging;
/// Regression models and metrics.
pub mod ml;
/// Prediction service and reports.
pub mod prediction;
/// SQLite project store.
pub mod store;
