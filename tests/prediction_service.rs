//! End-to-end checks of the prediction service over a seeded SQLite store.

mod support;

use std::sync::Arc;

use support::fixtures::{FixtureDb, ProjectSeed};
use support::yachtcrm_env::YachtcrmEnvGuard;
use tempfile::tempdir;
use yachtcrm::config::{self, PredictionConfig, UnlabeledRows};
use yachtcrm::ml::gbdt::GbdtRegressionModel;
use yachtcrm::prediction::{
    CancelToken, DelayModel, ModelKind, PredictionError, PredictionService,
};
use yachtcrm::store::ProjectStore;

fn service_for(db: FixtureDb, config: PredictionConfig) -> PredictionService {
    PredictionService::new(Arc::new(db.store), config)
}

#[test]
fn trains_from_file_store_and_ranks_risky_projects() {
    let dir = tempdir().unwrap();
    let db = FixtureDb::at(&dir.path().join("crm.db"));
    db.seed_history(40);
    let mut risky = ProjectSeed::active("Custom Explorer", 7);
    risky.feedback = vec![6, 8];
    let risky_id = db.add(&risky);
    let calm_id = db.add(&ProjectSeed::active("Day Cruiser", 2));

    let service = service_for(db, PredictionConfig::default());
    assert_eq!(service.train(&CancelToken::new()).unwrap(), 40);
    assert_eq!(
        service.status().unwrap().kind,
        Some(ModelKind::BoostedStumps)
    );

    let ranked = service.high_risk_projects().unwrap();
    let ids: Vec<i64> = ranked.iter().map(|r| r.project_id).collect();
    assert_eq!(ids, vec![risky_id]);
    assert!(!ids.contains(&calm_id));
    let record = &ranked[0];
    assert_eq!(record.customer_name, "Harbour Holdings");
    assert_eq!(record.change_request_count, 7);
    assert!((record.feedback_score - 7.0).abs() < 1e-9);
    assert!(record.predicted_delay > 15.0);
}

#[test]
fn sparse_store_falls_back_and_reports_insufficient_data() {
    let db = FixtureDb::in_memory();
    let ids = db.seed_history(3);
    let service = service_for(db, PredictionConfig::default());

    let prediction = service.predict_project(ids[2]).unwrap();
    // History 2 has two change requests and finished six days late.
    assert_eq!(prediction.predicted_delay_days, 6.0);
    assert_eq!(service.status().unwrap().kind, Some(ModelKind::LabelEcho));

    let report = service.cross_validate(5).unwrap();
    assert!(report.folds.is_empty());
    assert_eq!(report.row_count, 3);

    let importance = service.feature_importance().unwrap();
    assert!(importance.items.is_empty());
    assert_eq!(importance.row_count, 3);

    assert!(matches!(
        service.predict_project(9_999),
        Err(PredictionError::NotFound(9_999))
    ));
}

#[test]
fn evaluation_policy_decides_whether_active_projects_count() {
    let db = FixtureDb::in_memory();
    db.seed_history(24);
    for i in 0..6 {
        db.add(&ProjectSeed::active(&format!("Open {i}"), i));
    }
    let zero_fill = service_for(db, PredictionConfig::default());
    let report = zero_fill.cross_validate(4).unwrap();
    assert_eq!(report.row_count, 30);
    assert_eq!(report.folds.len(), 4);
    assert_eq!(report.folds.iter().map(|f| f.test_rows).sum::<usize>(), 30);
    assert!(report.mean_rmse >= 0.0);

    let db = FixtureDb::in_memory();
    db.seed_history(24);
    for i in 0..6 {
        db.add(&ProjectSeed::active(&format!("Open {i}"), i));
    }
    let mut config = PredictionConfig::default();
    config.evaluation.unlabeled_rows = UnlabeledRows::Exclude;
    let exclude = service_for(db, config);
    let report = exclude.cross_validate(4).unwrap();
    assert_eq!(report.row_count, 24);
    assert_eq!(report.folds.len(), 4);

    let importance = exclude.feature_importance().unwrap();
    assert_eq!(importance.items[0].feature_name, "change_request_count");
}

#[test]
fn clustering_and_top_delays_cover_the_store() {
    let db = FixtureDb::in_memory();
    db.seed_history(30);
    let mut no_model = ProjectSeed::active("Tender", 1);
    no_model.length_m = None;
    let tender = db.add(&no_model);
    let service = service_for(db, PredictionConfig::default());

    let clusters = service.run_clustering(3).unwrap();
    assert_eq!(clusters.len(), 31);
    assert!(clusters.iter().any(|c| c.project_id == tender));
    assert!(clusters.iter().all(|c| c.cluster_label < 3));

    let top = service.top_predicted_delays(5).unwrap();
    assert_eq!(top.len(), 5);
    assert!(top.iter().all(|r| r.project_id != tender));
    assert!(
        top.windows(2)
            .all(|w| w[0].predicted_delay >= w[1].predicted_delay)
    );
}

#[test]
fn exported_model_reproduces_service_predictions() {
    let dir = tempdir().unwrap();
    let db = FixtureDb::in_memory();
    db.seed_history(40);
    let service = service_for(db, PredictionConfig::default());
    service.train(&CancelToken::new()).unwrap();

    let held = service.held_model().unwrap().unwrap();
    let DelayModel::Boosted(model) = &held.model else {
        panic!("expected boosted model, got {:?}", held.model.kind());
    };
    let path = dir.path().join("delay_model.json");
    model.save_json(&path).unwrap();
    let reloaded = GbdtRegressionModel::load_json(&path).unwrap();

    let features = [30.0, 1_200_000.0, 40.0, 5.0, 12.0, 0.0, 0.0];
    let from_service = service
        .predict_delay(30.0, 1_200_000.0, 40, 5, 12)
        .unwrap();
    assert_eq!(reloaded.predict(&features), from_service);
}

#[test]
fn config_in_app_root_drives_risk_thresholds() {
    let home = tempdir().unwrap();
    let _env = YachtcrmEnvGuard::set_config_home(home.path().to_path_buf());
    let path = config::config_path().unwrap();
    std::fs::write(
        &path,
        "[risk]\ndelay_threshold_days = 100.0\n\n[training]\nsparse_fallback = \"heuristic\"\n",
    )
    .unwrap();
    let loaded = config::load_or_default().unwrap();
    assert_eq!(loaded.risk.delay_threshold_days, 100.0);

    let db = FixtureDb::in_memory();
    db.seed_history(40);
    db.add(&ProjectSeed::active("Custom Explorer", 7));
    let service = service_for(db, loaded);
    assert!(service.high_risk_projects().unwrap().is_empty());
}

#[test]
fn read_only_store_serves_predictions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("crm.db");
    {
        let db = FixtureDb::at(&path);
        db.seed_history(12);
    }
    let store = ProjectStore::open_read_only(&path).unwrap();
    let service = PredictionService::new(Arc::new(store), PredictionConfig::default());
    assert_eq!(service.train(&CancelToken::new()).unwrap(), 12);
    assert!(service.predict_delay(30.0, 1_200_000.0, 40, 3, 12).is_ok());
}
