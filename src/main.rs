//! Command-line front end for the yacht CRM delay predictor.
//!
//! Reports are printed to stdout as pretty JSON; logs go to stderr and the
//! log directory.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use yachtcrm::app_dirs;
use yachtcrm::config::{self, PredictionConfig};
use yachtcrm::logging;
use yachtcrm::prediction::{CancelToken, DelayModel, ModelStatus, PredictionService};
use yachtcrm::store::ProjectStore;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    db_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    command: Command,
}

#[derive(Debug, Clone)]
enum Command {
    Train { export: Option<PathBuf> },
    PredictProject { project_id: i64 },
    PredictValues(PredictValues),
    Metrics { folds: Option<usize> },
    Importance,
    HighRisk,
    Clusters { k: Option<usize> },
    Top { limit: Option<usize> },
    Status,
}

#[derive(Debug, Clone, Default)]
struct PredictValues {
    length_m: f32,
    base_price: f32,
    task_count: u32,
    change_request_count: u32,
    interaction_count: u32,
}

#[derive(Serialize)]
struct TrainOutput {
    labeled_rows: usize,
    status: ModelStatus,
    exported_to: Option<PathBuf>,
}

#[derive(Serialize)]
struct PredictOutput {
    predicted_delay_days: f32,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init_with_default("warn,yachtcrm=info") {
        eprintln!("Logging disabled: {err}");
    }

    let config = match &options.config_path {
        Some(path) => config::load_from(path),
        None => config::load_or_default(),
    }
    .map_err(|err| err.to_string())?;
    let db_path = resolve_db_path(options.db_path.clone(), &config)?;
    let store = ProjectStore::open(&db_path).map_err(|err| err.to_string())?;
    let service = PredictionService::new(Arc::new(store), config);
    let folds_default = service.config().evaluation.folds;
    let k_default = service.config().clustering.k;
    let limit_default = service.config().risk.top_limit;

    match options.command {
        Command::Train { export } => {
            let labeled_rows = service
                .train(&CancelToken::new())
                .map_err(|err| err.to_string())?;
            if let Some(path) = &export {
                export_model(&service, path)?;
            }
            print_json(&TrainOutput {
                labeled_rows,
                status: service.status().map_err(|err| err.to_string())?,
                exported_to: export,
            })
        }
        Command::PredictProject { project_id } => {
            print_json(&service.predict_project(project_id).map_err(|err| err.to_string())?)
        }
        Command::PredictValues(values) => {
            let predicted = service
                .predict_delay(
                    values.length_m,
                    values.base_price,
                    values.task_count,
                    values.change_request_count,
                    values.interaction_count,
                )
                .map_err(|err| err.to_string())?;
            print_json(&PredictOutput {
                predicted_delay_days: predicted,
            })
        }
        Command::Metrics { folds } => print_json(
            &service
                .cross_validate(folds.unwrap_or(folds_default))
                .map_err(|err| err.to_string())?,
        ),
        Command::Importance => {
            print_json(&service.feature_importance().map_err(|err| err.to_string())?)
        }
        Command::HighRisk => {
            print_json(&service.high_risk_projects().map_err(|err| err.to_string())?)
        }
        Command::Clusters { k } => print_json(
            &service
                .run_clustering(k.unwrap_or(k_default))
                .map_err(|err| err.to_string())?,
        ),
        Command::Top { limit } => print_json(
            &service
                .top_predicted_delays(limit.unwrap_or(limit_default))
                .map_err(|err| err.to_string())?,
        ),
        Command::Status => print_json(&service.status().map_err(|err| err.to_string())?),
    }
}

fn resolve_db_path(cli: Option<PathBuf>, config: &PredictionConfig) -> Result<PathBuf, String> {
    if let Some(path) = cli.or_else(|| config.database_path.clone()) {
        return Ok(path);
    }
    app_dirs::default_db_path().map_err(|err| err.to_string())
}

fn export_model(service: &PredictionService, path: &std::path::Path) -> Result<(), String> {
    let held = service.held_model().map_err(|err| err.to_string())?;
    match held.as_deref().map(|trained| &trained.model) {
        Some(DelayModel::Boosted(model)) => model.save_json(path),
        Some(other) => Err(format!(
            "Nothing to export: {:?} fallback is installed until more projects complete",
            other.kind()
        )),
        None => Err("Nothing to export: no model trained".to_string()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{text}");
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut command_name: Option<String> = None;
    let mut export: Option<PathBuf> = None;
    let mut project_id: Option<i64> = None;
    let mut values = PredictValues::default();
    let mut saw_value = false;
    let mut folds: Option<usize> = None;
    let mut k: Option<usize> = None;
    let mut limit: Option<usize> = None;

    let mut idx = 0usize;
    while idx < args.len() {
        let arg = args[idx].as_str();
        let mut value = |name: &str| -> Result<String, String> {
            idx += 1;
            args.get(idx)
                .cloned()
                .ok_or_else(|| format!("{name} requires a value"))
        };
        match arg {
            "-h" | "--help" => return Err(help_text()),
            "--db" => db_path = Some(PathBuf::from(value("--db")?)),
            "--config" => config_path = Some(PathBuf::from(value("--config")?)),
            "--export" => export = Some(PathBuf::from(value("--export")?)),
            "--project" => project_id = Some(parse_number("--project", &value("--project")?)?),
            "--length" => {
                values.length_m = parse_number("--length", &value("--length")?)?;
                saw_value = true;
            }
            "--price" => {
                values.base_price = parse_number("--price", &value("--price")?)?;
                saw_value = true;
            }
            "--tasks" => {
                values.task_count = parse_number("--tasks", &value("--tasks")?)?;
                saw_value = true;
            }
            "--change-requests" => {
                values.change_request_count =
                    parse_number("--change-requests", &value("--change-requests")?)?;
                saw_value = true;
            }
            "--interactions" => {
                values.interaction_count =
                    parse_number("--interactions", &value("--interactions")?)?;
                saw_value = true;
            }
            "--folds" => folds = Some(parse_number("--folds", &value("--folds")?)?),
            "--k" => k = Some(parse_number("--k", &value("--k")?)?),
            "--limit" => limit = Some(parse_number("--limit", &value("--limit")?)?),
            other if !other.starts_with('-') && command_name.is_none() => {
                command_name = Some(other.to_string());
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let command_name = command_name.ok_or_else(help_text)?;
    let command = match command_name.as_str() {
        "train" => Command::Train { export },
        "predict" => match (project_id, saw_value) {
            (Some(_), true) => {
                return Err("Use either --project or raw values, not both".to_string());
            }
            (Some(project_id), false) => Command::PredictProject { project_id },
            (None, true) => Command::PredictValues(values),
            (None, false) => {
                return Err("predict requires --project or at least one raw value".to_string());
            }
        },
        "metrics" => Command::Metrics { folds },
        "importance" => Command::Importance,
        "high-risk" => Command::HighRisk,
        "clusters" => Command::Clusters { k },
        "top" => Command::Top { limit },
        "status" => Command::Status,
        other => return Err(format!("Unknown command: {other}\n\n{}", help_text())),
    };
    Ok(CliOptions {
        db_path,
        config_path,
        command,
    })
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "yachtcrm-ml",
        "",
        "Usage:",
        "  yachtcrm-ml [--db <path>] [--config <path>] <command> [options]",
        "",
        "Commands:",
        "  train [--export <model.json>]   Retrain the delay model from the database.",
        "  predict --project <id>          Predict the delay of a stored project.",
        "  predict --length <m> --price <eur> --tasks <n> --change-requests <n> --interactions <n>",
        "                                  Predict from raw values (missing values are 0).",
        "  metrics [--folds <n>]           K-fold cross-validation report.",
        "  importance                      Feature importance by absolute correlation.",
        "  high-risk                       Active projects over both risk thresholds.",
        "  clusters [--k <n>]              K-means clusters for the risk dashboard.",
        "  top [--limit <n>]               Projects with the largest predicted delay.",
        "  status                          Model state without training.",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_raw_prediction_values() {
        let options = parse_args(args(&[
            "--db",
            "crm.db",
            "predict",
            "--length",
            "45",
            "--price",
            "850000",
            "--tasks",
            "54",
            "--change-requests",
            "2",
            "--interactions",
            "10",
        ]))
        .unwrap();
        assert_eq!(options.db_path, Some(PathBuf::from("crm.db")));
        match options.command {
            Command::PredictValues(values) => {
                assert_eq!(values.length_m, 45.0);
                assert_eq!(values.base_price, 850_000.0);
                assert_eq!(values.task_count, 54);
                assert_eq!(values.change_request_count, 2);
                assert_eq!(values.interaction_count, 10);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_project_prediction_and_options() {
        let options = parse_args(args(&["predict", "--project", "12"])).unwrap();
        assert!(matches!(
            options.command,
            Command::PredictProject { project_id: 12 }
        ));
        let options = parse_args(args(&["clusters", "--k", "4"])).unwrap();
        assert!(matches!(options.command, Command::Clusters { k: Some(4) }));
        let options = parse_args(args(&["metrics"])).unwrap();
        assert!(matches!(options.command, Command::Metrics { folds: None }));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["predict"])).is_err());
        assert!(parse_args(args(&["predict", "--project", "1", "--tasks", "3"])).is_err());
        assert!(parse_args(args(&["top", "--limit", "many"])).is_err());
        assert!(parse_args(args(&["explode"])).is_err());
        assert!(parse_args(args(&["train", "--export"])).is_err());
    }
}
