//! Matchup predictions from point-in-time features
//!
//! Feature building and inference are synchronous and CPU-bound. Batches of
//! listings are spread across the rayon pool, one matchup per task.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

use super::registry::ModelRegistry;
use super::teams::TeamDirectory;
use crate::data::TeamGameHistory;
use crate::features::{
    ClassifierFeatures, FeatureRow, FeatureSchema, PointInTimeFeatureBuilder, RegressorFeatures,
};
use crate::model::ModelBundle;
use crate::{PredictionResult, Recommendation};

/// A team as named by an upstream market listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedTeam {
    pub name: String,
}

/// An upcoming game as described by an upstream market listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameListing {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub teams: Vec<ListedTeam>,
}

/// Work out `(home, away)` names for a listing.
///
/// Titles read `"<Away> vs. <Home>"` (or `"<Away> vs <Home>"`). When the
/// title does not split into exactly two parts the team list is taken as
/// home first, which is wrong whenever the listing orders teams otherwise.
/// Listings naming fewer than two teams are skipped.
pub fn listing_sides(listing: &GameListing) -> Option<(String, String)> {
    if listing.teams.len() < 2 {
        return None;
    }
    let title = listing.title.as_str();
    let parts: Vec<&str> = if title.contains(" vs. ") {
        title.split(" vs. ").collect()
    } else {
        title.split(" vs ").collect()
    };
    if let [away, home] = parts.as_slice() {
        Some((home.trim().to_string(), away.trim().to_string()))
    } else {
        Some((listing.teams[0].name.clone(), listing.teams[1].name.clone()))
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Serves predictions for matchups
pub struct PredictionEngine {
    registry: Arc<ModelRegistry>,
    teams: TeamDirectory,
    history: RwLock<Arc<TeamGameHistory>>,
    season: String,
}

impl PredictionEngine {
    pub fn new(
        registry: Arc<ModelRegistry>,
        teams: TeamDirectory,
        history: TeamGameHistory,
        season: impl Into<String>,
    ) -> Self {
        PredictionEngine {
            registry,
            teams,
            history: RwLock::new(Arc::new(history)),
            season: season.into(),
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn season(&self) -> &str {
        &self.season
    }

    /// Snapshot of the history used for features
    pub fn history(&self) -> Arc<TeamGameHistory> {
        let guard = self
            .history
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(&guard)
    }

    /// Serve a refreshed game log; in-flight predictions keep their snapshot
    pub fn replace_history(&self, history: TeamGameHistory) {
        let mut guard = self
            .history
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(history);
    }

    /// Predict a game played today
    pub fn predict(&self, home_team: &str, away_team: &str) -> Option<PredictionResult> {
        self.predict_on(home_team, away_team, chrono::Local::now().date_naive())
    }

    /// Predict a game played on `date`.
    ///
    /// Returns a placeholder while no model is loaded and `None` when a team
    /// name cannot be resolved.
    pub fn predict_on(
        &self,
        home_team: &str,
        away_team: &str,
        date: NaiveDate,
    ) -> Option<PredictionResult> {
        let Some(bundle) = self.registry.get() else {
            log::warn!(
                "No model loaded, returning placeholder for {} vs {}",
                home_team,
                away_team
            );
            return Some(PredictionResult::placeholder(home_team, away_team));
        };

        let (Some(home_id), Some(away_id)) =
            (self.teams.resolve(home_team), self.teams.resolve(away_team))
        else {
            log::warn!("Could not resolve teams: {:?} vs {:?}", home_team, away_team);
            return None;
        };

        let history = self.history();
        let row = PointInTimeFeatureBuilder::build(home_id, away_id, date, &self.season, &history);
        Some(Self::compose(&bundle, home_team, away_team, &row))
    }

    /// Predict today's listings, one result per listing in input order
    pub fn predict_games(&self, listings: &[GameListing]) -> Vec<Option<PredictionResult>> {
        self.predict_games_on(listings, chrono::Local::now().date_naive())
    }

    pub fn predict_games_on(
        &self,
        listings: &[GameListing],
        date: NaiveDate,
    ) -> Vec<Option<PredictionResult>> {
        listings
            .par_iter()
            .map(|listing| {
                let (home, away) = listing_sides(listing)?;
                let mut prediction = self.predict_on(&home, &away, date)?;
                prediction.game_id = Some(listing.id.clone());
                Some(prediction)
            })
            .collect()
    }

    fn compose(
        bundle: &ModelBundle,
        home_team: &str,
        away_team: &str,
        row: &FeatureRow,
    ) -> PredictionResult {
        let home_prob = bundle
            .classifier
            .home_win_probability(&ClassifierFeatures::from_row(row));
        let confidence = round_to((home_prob - 0.5).abs() * 2.0, 4);
        let winner = if home_prob > 0.5 { home_team } else { away_team };
        let tier = Recommendation::from_confidence(confidence);

        let mut result = PredictionResult {
            game_id: None,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_win_prob: round_to(home_prob, 4),
            away_win_prob: round_to(1.0 - home_prob, 4),
            predicted_winner: winner.to_string(),
            confidence,
            predicted_home_score: None,
            predicted_away_score: None,
            predicted_total: None,
            predicted_margin: None,
            tier,
            recommendation: tier.describe(winner, confidence),
            model_type: bundle.classifier.model_type.clone(),
            features_used: bundle.classifier.features.len(),
            is_placeholder: false,
        };

        if let Some(scores) = &bundle.scores {
            let (home, away) = scores.predict(&RegressorFeatures::from_row(row));
            result.predicted_home_score = Some(home.round() as i32);
            result.predicted_away_score = Some(away.round() as i32);
            result.predicted_total = Some((home + away).round() as i32);
            result.predicted_margin = Some(round_to(home - away, 1));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::history::tests::record;
    use crate::model::bundle::tests::sample_bundle;
    use crate::{Role, TeamGameRecord};

    const CELTICS: i64 = 1610612738;
    const KNICKS: i64 = 1610612752;

    fn listing(id: &str, title: &str, teams: &[&str]) -> GameListing {
        GameListing {
            id: id.to_string(),
            title: title.to_string(),
            teams: teams
                .iter()
                .map(|n| ListedTeam {
                    name: n.to_string(),
                })
                .collect(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    /// Celtics shoot better than the Knicks over their prior games
    fn history() -> TeamGameHistory {
        let mut log: Vec<TeamGameRecord> = Vec::new();
        for i in 0..3u32 {
            let mut home = record(i as u64 + 1, CELTICS, Role::Home, day(2 * i + 1), true);
            home.fg_pct = 0.52;
            let mut away = record(i as u64 + 1, KNICKS, Role::Away, day(2 * i + 1), false);
            away.fg_pct = 0.42;
            log.push(home);
            log.push(away);
        }
        TeamGameHistory::from_records(log).unwrap()
    }

    fn engine(loaded: bool) -> PredictionEngine {
        let registry = Arc::new(ModelRegistry::new("unused.json", "unused2.json"));
        if loaded {
            registry.install(sample_bundle());
        }
        PredictionEngine::new(registry, TeamDirectory::nba(), history(), "2024-25")
    }

    #[test]
    fn test_listing_sides_from_title() {
        let l = listing("1", "Knicks vs. Celtics", &["Celtics", "Knicks"]);
        assert_eq!(
            listing_sides(&l),
            Some(("Celtics".to_string(), "Knicks".to_string()))
        );

        let l = listing("2", "Knicks vs Celtics", &["Celtics", "Knicks"]);
        assert_eq!(listing_sides(&l).unwrap().0, "Celtics");
    }

    #[test]
    fn test_listing_sides_fallback_order() {
        let l = listing("3", "Knicks @ Celtics", &["Knicks", "Celtics"]);
        // No delimiter: first listed team is treated as home
        assert_eq!(
            listing_sides(&l),
            Some(("Knicks".to_string(), "Celtics".to_string()))
        );
        assert_eq!(listing_sides(&listing("4", "Knicks vs. Celtics", &["Knicks"])), None);
    }

    #[test]
    fn test_placeholder_when_unloaded() {
        let engine = engine(false);
        let p = engine.predict_on("Celtics", "Knicks", day(10)).unwrap();
        assert!(p.is_placeholder);
        assert_eq!(p.home_win_prob, 0.5);
        // Unresolvable names still get the placeholder while unloaded
        assert!(engine.predict_on("Sonics", "Knicks", day(10)).unwrap().is_placeholder);
    }

    #[test]
    fn test_unknown_team_is_none() {
        let engine = engine(true);
        assert!(engine.predict_on("Sonics", "Knicks", day(10)).is_none());
    }

    #[test]
    fn test_prediction_favours_better_shooting_home_team() {
        let engine = engine(true);
        let p = engine.predict_on("Boston Celtics", "knicks", day(10)).unwrap();
        assert!(!p.is_placeholder);
        // FG diff 0.10 * weight 20 => logit 2
        let expected = 1.0 / (1.0 + (-2.0f64).exp());
        assert!((p.home_win_prob - expected).abs() < 1e-4);
        assert!((p.home_win_prob + p.away_win_prob - 1.0).abs() < 1e-3);
        assert_eq!(p.predicted_winner, "Boston Celtics");
        assert_eq!(p.features_used, 12);

        // Win pct diff 1.0 => home 120, away 100
        assert_eq!(p.predicted_home_score, Some(120));
        assert_eq!(p.predicted_away_score, Some(100));
        assert_eq!(p.predicted_total, Some(220));
        assert_eq!(p.predicted_margin, Some(20.0));
    }

    #[test]
    fn test_no_history_uses_neutral_features() {
        let engine = engine(true);
        let p = engine.predict_on("Lakers", "Heat", day(10)).unwrap();
        assert_eq!(p.home_win_prob, 0.5);
        assert_eq!(p.confidence, 0.0);
        assert_eq!(p.tier, Recommendation::CoinFlip);
        assert_eq!(p.predicted_winner, "Heat");
    }

    #[test]
    fn test_predict_games_preserves_order() {
        let engine = engine(true);
        let listings = vec![
            listing("a", "Knicks vs. Celtics", &["Celtics", "Knicks"]),
            listing("b", "Only one", &["Celtics"]),
            listing("c", "Sonics vs. Celtics", &["Celtics", "Sonics"]),
            listing("d", "Heat vs Lakers", &["Lakers", "Heat"]),
        ];
        let results = engine.predict_games_on(&listings, day(10));
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().game_id.as_deref(), Some("a"));
        assert_eq!(results[0].as_ref().unwrap().home_team, "Celtics");
        assert!(results[1].is_none());
        assert!(results[2].is_none());
        assert_eq!(results[3].as_ref().unwrap().home_team, "Lakers");
    }

    #[test]
    fn test_history_swap() {
        let engine = engine(true);
        let old = engine.history();
        engine.replace_history(TeamGameHistory::new());
        assert_eq!(old.len(), 6);
        assert!(engine.history().is_empty());
    }
}
