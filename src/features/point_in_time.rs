//! Features for a single matchup as of an arbitrary date
//!
//! Produces the same columns as the training table. Per-team form is taken
//! from the requested season only; head-to-head looks across all seasons.

use chrono::NaiveDate;

use super::head_to_head::HeadToHeadResolver;
use super::schema::{FeatureRow, SideFeatures};
use super::team_stats::{rest_days, win_pct, FORM_WINDOW, ROLLING_WINDOW};
use crate::data::TeamGameHistory;
use crate::{TeamGameRecord, TeamId};

pub struct PointInTimeFeatureBuilder;

impl PointInTimeFeatureBuilder {
    /// Features for `home` hosting `away` on `as_of`, using only games
    /// dated strictly before it.
    ///
    /// Falls back to [`FeatureRow::neutral`] when either team has no games
    /// in `season` yet.
    pub fn build(
        home: TeamId,
        away: TeamId,
        as_of: NaiveDate,
        season: &str,
        history: &TeamGameHistory,
    ) -> FeatureRow {
        let home_games = history.team_season_before(home, season, as_of);
        let away_games = history.team_season_before(away, season, as_of);

        let (Some(home_side), Some(away_side)) = (
            Self::side(&home_games, as_of),
            Self::side(&away_games, as_of),
        ) else {
            log::debug!(
                "No {} history before {} for {} or {}, using neutral features",
                season,
                as_of,
                home,
                away
            );
            return FeatureRow::neutral();
        };

        let h2h = HeadToHeadResolver::resolve(home, away, as_of, history.records());
        FeatureRow::assemble(home_side, away_side, h2h)
    }

    /// One side's form from its date-ordered prior games
    fn side(games: &[&TeamGameRecord], as_of: NaiveDate) -> Option<SideFeatures> {
        let last = games.last()?;

        let wins: u32 = games.iter().map(|r| r.wins).sum();
        let losses: u32 = games.iter().map(|r| r.losses).sum();
        let home_wins: u32 = games.iter().map(|r| r.home_wins).sum();
        let home_losses: u32 = games.iter().map(|r| r.home_losses).sum();
        let road_wins: u32 = games.iter().map(|r| r.road_wins).sum();
        let road_losses: u32 = games.iter().map(|r| r.road_losses).sum();

        let recent = &games[games.len().saturating_sub(ROLLING_WINDOW)..];
        let mean = |metric: fn(&TeamGameRecord) -> f64| -> f64 {
            recent.iter().map(|r| metric(r)).sum::<f64>() / recent.len() as f64
        };
        let form = &games[games.len().saturating_sub(FORM_WINDOW)..];

        let rest = rest_days(last.date, as_of);
        Some(SideFeatures {
            home_win_pct: win_pct(home_wins, home_losses),
            away_win_pct: win_pct(road_wins, road_losses),
            total_win_pct: win_pct(wins, losses),
            rest_days: rest,
            back_to_back: if rest == 1.0 { 1.0 } else { 0.0 },
            rolling_oe: mean(|r| r.offensive_efficiency),
            rolling_scoring_margin: mean(|r| r.scoring_margin),
            rolling_fg_pct: mean(|r| r.fg_pct),
            last_3_wins: form.iter().map(|r| r.wins as f64).sum(),
        })
    }
}
