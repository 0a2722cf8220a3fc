//! Training table construction
//!
//! Walks every team-season in date order, snapshotting each team's form
//! before folding in the game, then joins the two sides of every game.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::head_to_head::HeadToHeadIndex;
use super::schema::{FeatureRow, SideFeatures};
use super::team_stats::SeasonForm;
use crate::data::TeamGameHistory;
use crate::{GameId, TeamGameRecord, TeamId};

/// One historical game with its pre-game features and outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub game_id: GameId,
    pub season: String,
    pub date: NaiveDate,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub features: FeatureRow,
    pub home_won: bool,
    pub home_points: Option<u32>,
    pub away_points: Option<u32>,
}

impl TrainingRow {
    /// Both final scores are known
    pub fn scores(&self) -> Option<(u32, u32)> {
        Some((self.home_points?, self.away_points?))
    }
}

/// Builds one feature row per completed game
pub struct BatchFeatureBuilder;

impl BatchFeatureBuilder {
    /// Rows ordered by (date, game id)
    pub fn build(history: &TeamGameHistory) -> Vec<TrainingRow> {
        let snapshots: HashMap<(GameId, TeamId), SideFeatures> = history
            .team_seasons()
            .par_iter()
            .flat_map_iter(|games| Self::season_snapshots(games))
            .collect();

        let index = HeadToHeadIndex::build(history.records());

        let rows: Vec<TrainingRow> = history
            .matchups()
            .par_iter()
            .filter_map(|m| {
                let home = snapshots.get(&(m.game_id(), m.home.team_id))?;
                let away = snapshots.get(&(m.game_id(), m.away.team_id))?;
                let h2h = index.resolve(m.home.team_id, m.away.team_id, m.date());

                let mut features = FeatureRow::assemble(*home, *away, h2h);
                features.fill_non_finite(0.0);

                Some(TrainingRow {
                    game_id: m.game_id(),
                    season: m.season().to_string(),
                    date: m.date(),
                    home_team: m.home.team_id,
                    away_team: m.away.team_id,
                    features,
                    home_won: m.home.won(),
                    home_points: m.home.points,
                    away_points: m.away.points,
                })
            })
            .collect();

        log::info!(
            "Built {} training rows from {} log rows",
            rows.len(),
            history.len()
        );
        rows
    }

    /// Pre-game features for each game of one date-ordered team-season
    fn season_snapshots(games: &[&TeamGameRecord]) -> Vec<((GameId, TeamId), SideFeatures)> {
        let mut form = SeasonForm::new();
        games
            .iter()
            .map(|record| {
                let snapshot = form.snapshot(record.date);
                form.update(record);
                ((record.game_id, record.team_id), snapshot)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::history::tests::record;
    use crate::Role;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
    }

    fn game(id: u64, home: i64, away: i64, d: u32, home_won: bool) -> Vec<TeamGameRecord> {
        vec![
            record(id, home, Role::Home, day(d), home_won),
            record(id, away, Role::Away, day(d), !home_won),
        ]
    }

    fn sample_history() -> TeamGameHistory {
        let mut log = Vec::new();
        log.extend(game(1, 1, 2, 1, true));
        log.extend(game(2, 2, 1, 3, true));
        log.extend(game(3, 1, 2, 4, true));
        log.extend(game(4, 1, 2, 8, false));
        TeamGameHistory::from_records(log).unwrap()
    }

    #[test]
    fn test_first_game_uses_opener_values() {
        let rows = BatchFeatureBuilder::build(&sample_history());
        let first = &rows[0];
        assert_eq!(first.game_id, GameId(1));
        assert_eq!(first.features.home, SideFeatures::SEASON_OPENER);
        assert_eq!(first.features.away, SideFeatures::SEASON_OPENER);
        assert_eq!(first.features.rest_diff, 0.0);
        assert!(first.home_won);
    }

    #[test]
    fn test_cumulative_values_are_shifted_once() {
        let rows = BatchFeatureBuilder::build(&sample_history());
        // Team 1 goes into game 3 having won game 1 at home and lost game 2 away
        let third = &rows[2];
        assert_eq!(third.home_team, TeamId(1));
        assert_eq!(third.features.home.total_win_pct, 0.5);
        assert_eq!(third.features.home.home_win_pct, 1.0);
        assert_eq!(third.features.home.away_win_pct, 0.0);
        assert_eq!(third.features.home.rest_days, 1.0);
        assert_eq!(third.features.home.back_to_back, 1.0);
        assert_eq!(third.features.home.last_3_wins, 1.0);
        assert_eq!(third.features.home.rolling_scoring_margin, 0.0);
    }

    #[test]
    fn test_head_to_head_needs_two_meetings() {
        let rows = BatchFeatureBuilder::build(&sample_history());
        // Before game 3 team 1 hosted team 2 once
        assert_eq!(rows[2].features.h2h_home_win_pct, 0.5);
        // Before game 4 it had hosted and won twice
        assert_eq!(rows[3].features.h2h_home_win_pct, 1.0);
        assert_eq!(rows[3].features.h2h_home_avg_margin, 6.0);
    }

    #[test]
    fn test_rows_are_sorted_and_deterministic() {
        let history = sample_history();
        let a = BatchFeatureBuilder::build(&history);
        let b = BatchFeatureBuilder::build(&history);
        assert_eq!(a, b);
        let ids: Vec<_> = a.iter().map(|r| r.game_id.0).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_scores_are_carried() {
        let rows = BatchFeatureBuilder::build(&sample_history());
        assert_eq!(rows[0].scores(), Some((112, 106)));
        assert!(rows.iter().all(|r| r.features.to_vec().iter().all(|v| v.is_finite())));
    }
}
