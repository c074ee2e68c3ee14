//! TOML configuration for the prediction subsystem.
//!
//! Settings live in `config.toml` under the app root. Every key is optional;
//! missing keys fall back to the defaults in [`defaults`].

mod defaults;
mod errors;
mod io;
mod types;


pub use errors::ConfigError;
pub use io::{CONFIG_FILE_NAME, config_path, load_from, load_or_default, save_to_path};
pub use types::{
    ClusteringSettings, EvaluationSettings, PredictionConfig, RiskSettings, SparseFallback,
    TrainingSettings, UnlabeledRows,
};
