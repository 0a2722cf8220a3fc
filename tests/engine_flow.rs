mod common;

use common::*;
use courtside::data::{Database, GameLogReader, TeamGameHistory};
use courtside::features::{ClassifierFeatures, FeatureSchema};
use courtside::model::bundle::CLASSIFIER_KIND;
use courtside::model::{ClassifierArtifact, LinearModel, LogisticModel, ModelBundle, Standardizer};
use courtside::predict::{
    GameListing, ListedTeam, ModelRegistry, ModelStatus, PredictionEngine, RetrainStatus,
    TeamDirectory,
};
use courtside::training::ClassifierMetrics;
use courtside::{Config, CourtsideError, Recommendation};
use std::sync::Arc;

fn training_config() -> courtside::TrainingConfig {
    let mut config = Config::default().training;
    config.epochs = 150;
    config
}

#[test]
fn test_import_train_predict_and_log() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("logs.csv");
    let league = two_season_league();
    write_csv(&league, std::fs::File::create(&csv_path).unwrap());

    let records = GameLogReader::read_path(&csv_path).unwrap();
    assert_eq!(records, league);

    let mut db = Database::open(dir.path().join("db/courtside.db")).unwrap();
    db.upsert_game_logs(&records).unwrap();
    let history = db.load_history().unwrap();
    assert_eq!(history.len(), league.len());

    let registry = Arc::new(ModelRegistry::new(
        dir.path().join("model/clf.json"),
        dir.path().join("model/scores.json"),
    ));
    let engine = PredictionEngine::new(
        Arc::clone(&registry),
        TeamDirectory::nba(),
        history,
        "2024-25",
    );

    let before = engine.predict_on("Celtics", "Lakers", date(2025, 3, 1)).unwrap();
    assert!(before.is_placeholder);

    let status = registry.retrain(&engine.history(), &training_config());
    match &status {
        RetrainStatus::Success { classifier, scores } => {
            assert!(classifier.test_samples > 0);
            assert!(scores.is_some());
        }
        RetrainStatus::Error { error } => panic!("retrain failed: {}", error),
    }

    let p = engine.predict_on("Celtics", "Lakers", date(2025, 3, 1)).unwrap();
    assert!(!p.is_placeholder);
    assert!((p.home_win_prob + p.away_win_prob - 1.0).abs() < 1e-3);
    assert!((p.confidence - (p.home_win_prob - 0.5).abs() * 2.0).abs() < 1e-3);
    assert_eq!(p.tier, Recommendation::from_confidence(p.confidence));
    assert_eq!(p.predicted_winner == "Celtics", p.home_win_prob > 0.5);
    assert_eq!(p.features_used, 12);
    assert!(p.predicted_home_score.is_some());

    // The strongest team at home should be favoured over the weakest
    assert!(p.home_win_prob > 0.5);

    // A fresh registry reading the saved artifacts serves the same answer
    let reloaded = Arc::new(ModelRegistry::new(
        dir.path().join("model/clf.json"),
        dir.path().join("model/scores.json"),
    ));
    assert_eq!(reloaded.load(), ModelStatus::Loaded);
    let engine2 = PredictionEngine::new(
        reloaded,
        TeamDirectory::nba(),
        db.load_history().unwrap(),
        "2024-25",
    );
    let again = engine2.predict_on("Celtics", "Lakers", date(2025, 3, 1)).unwrap();
    assert!((again.home_win_prob - p.home_win_prob).abs() < 1e-9);

    let id = db.log_prediction(&p).unwrap();
    assert!(db.record_result(id, "Celtics").unwrap());
    let summary = db.prediction_accuracy().unwrap();
    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.accuracy, Some(if p.predicted_winner == "Celtics" { 1.0 } else { 0.0 }));
}

#[test]
fn test_predict_listings() {
    let history = courtside::data::TeamGameHistory::from_records(two_season_league()).unwrap();
    let registry = Arc::new(ModelRegistry::new("unused_a.json", "unused_b.json"));
    let dir = tempfile::tempdir().unwrap();
    let training_registry = ModelRegistry::new(dir.path().join("a.json"), dir.path().join("b.json"));
    assert!(training_registry.retrain(&history, &training_config()).is_success());
    registry.install((*training_registry.get().unwrap()).clone());

    let engine = PredictionEngine::new(registry, TeamDirectory::nba(), history, "2024-25");
    let listing = |id: &str, title: &str, teams: [&str; 2]| GameListing {
        id: id.to_string(),
        title: title.to_string(),
        teams: teams
            .iter()
            .map(|n| ListedTeam { name: n.to_string() })
            .collect(),
    };
    let listings = vec![
        listing("g1", "Lakers vs. Celtics", ["Celtics", "Lakers"]),
        listing("g2", "Knicks vs Heat", ["Heat", "Knicks"]),
        listing("g3", "Sonics vs. Suns", ["Suns", "Sonics"]),
    ];

    let results = engine.predict_games_on(&listings, date(2025, 3, 1));
    assert_eq!(results.len(), 3);
    let first = results[0].as_ref().unwrap();
    assert_eq!(first.game_id.as_deref(), Some("g1"));
    assert_eq!((first.home_team.as_str(), first.away_team.as_str()), ("Celtics", "Lakers"));
    assert_eq!(results[1].as_ref().unwrap().home_team, "Heat");
    assert!(results[2].is_none());
}

/// Engine whose classifier ignores the features and always returns `home_prob`
fn fixed_probability_engine(home_prob: f64) -> PredictionEngine {
    let classifier = ClassifierArtifact {
        model_type: CLASSIFIER_KIND.to_string(),
        model: LogisticModel {
            scaling: Standardizer {
                mean: vec![0.0; 12],
                std: vec![1.0; 12],
            },
            linear: LinearModel {
                weights: vec![0.0; 12],
                bias: (home_prob / (1.0 - home_prob)).ln(),
            },
        },
        features: ClassifierFeatures::column_names(),
        metrics: ClassifierMetrics::default(),
        trained_at: "2025-01-01T00:00:00Z".to_string(),
    };
    let registry = Arc::new(ModelRegistry::new("unused_a.json", "unused_b.json"));
    registry.install(ModelBundle::new(classifier, None).unwrap());
    PredictionEngine::new(registry, TeamDirectory::nba(), TeamGameHistory::new(), "2024-25")
}

#[test]
fn test_confidence_bands() {
    let on = date(2025, 1, 15);

    let strong = fixed_probability_engine(0.85)
        .predict_on("Celtics", "Lakers", on)
        .unwrap();
    assert!(!strong.is_placeholder);
    assert_eq!(strong.home_win_prob, 0.85);
    assert_eq!(strong.confidence, 0.7);
    assert_eq!(strong.tier, Recommendation::StrongBet);
    assert_eq!(strong.predicted_winner, "Celtics");
    assert!(strong.recommendation.starts_with("Strong bet on Celtics"));
    assert!(strong.predicted_home_score.is_none());

    let flip = fixed_probability_engine(0.55)
        .predict_on("Celtics", "Lakers", on)
        .unwrap();
    assert_eq!(flip.confidence, 0.1);
    assert_eq!(flip.tier, Recommendation::CoinFlip);
    assert_eq!(flip.predicted_winner, "Celtics");
    assert!(flip.recommendation.starts_with("Coin flip"));

    let away = fixed_probability_engine(0.25)
        .predict_on("Celtics", "Lakers", on)
        .unwrap();
    assert_eq!(away.away_win_prob, 0.75);
    assert_eq!(away.confidence, 0.5);
    assert_eq!(away.tier, Recommendation::ModerateLean);
    assert_eq!(away.predicted_winner, "Lakers");
    assert!(away.recommendation.starts_with("Moderate lean towards Lakers"));

    assert_eq!(Recommendation::from_confidence(0.4), Recommendation::ModerateLean);
    assert_eq!(Recommendation::from_confidence(0.2), Recommendation::SlightEdge);
}

#[test]
fn test_conflicting_import_keeps_history_loadable() {
    let mut db = Database::in_memory().unwrap();
    let first = game(61, "2024-25", date(2024, 10, 22), (CELTICS, 110), (KNICKS, 100));
    db.upsert_game_logs(&first).unwrap();

    // Same two teams on the same date under a new game id
    let second = game(99, "2024-25", date(2024, 10, 22), (CELTICS, 104), (KNICKS, 108));
    let result = db.upsert_game_logs(&second);
    assert!(matches!(result, Err(CourtsideError::Schema { .. })));

    let history = db.load_history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(db.get_game_logs().unwrap(), first.to_vec());

    // Re-importing the original rows is still accepted
    db.upsert_game_logs(&first).unwrap();
    assert_eq!(db.load_history().unwrap().len(), 2);
}
