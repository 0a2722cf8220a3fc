//! Team form accumulators
//!
//! Cumulative win splits and fixed-size rolling windows over a team's
//! season, fed one game at a time in date order.

use chrono::NaiveDate;
use std::collections::VecDeque;

use super::schema::SideFeatures;
use crate::TeamGameRecord;

/// Games averaged by the rolling efficiency, margin and shooting features
pub const ROLLING_WINDOW: usize = 5;
/// Games summed by the recent-form feature
pub const FORM_WINDOW: usize = 3;
/// Longest rest period reported
pub const MAX_REST_DAYS: i64 = 30;

/// Win rate with a zero denominator floored to 1
pub fn win_pct(wins: u32, losses: u32) -> f64 {
    wins as f64 / (wins + losses).max(1) as f64
}

/// Days between two games, capped at [`MAX_REST_DAYS`]
pub fn rest_days(previous: NaiveDate, current: NaiveDate) -> f64 {
    (current - previous).num_days().min(MAX_REST_DAYS) as f64
}

/// Fixed-capacity window over the most recent values
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        RollingWindow {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Add a value, evicting the oldest once full
    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum, oldest value first
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Mean of the values held so far, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum() / self.values.len() as f64)
        }
    }
}

/// Running form of one team within one season
#[derive(Debug, Clone)]
pub struct SeasonForm {
    wins: u32,
    losses: u32,
    home_wins: u32,
    home_losses: u32,
    road_wins: u32,
    road_losses: u32,
    last_date: Option<NaiveDate>,
    offensive_efficiency: RollingWindow,
    scoring_margin: RollingWindow,
    fg_pct: RollingWindow,
    recent_wins: RollingWindow,
}

impl Default for SeasonForm {
    fn default() -> Self {
        Self::new()
    }
}

impl SeasonForm {
    pub fn new() -> Self {
        SeasonForm {
            wins: 0,
            losses: 0,
            home_wins: 0,
            home_losses: 0,
            road_wins: 0,
            road_losses: 0,
            last_date: None,
            offensive_efficiency: RollingWindow::new(ROLLING_WINDOW),
            scoring_margin: RollingWindow::new(ROLLING_WINDOW),
            fg_pct: RollingWindow::new(ROLLING_WINDOW),
            recent_wins: RollingWindow::new(FORM_WINDOW),
        }
    }

    /// Games folded in so far
    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    /// Features for a game on `date`, from the games already folded in.
    ///
    /// Returns [`SideFeatures::SEASON_OPENER`] before the first game.
    pub fn snapshot(&self, date: NaiveDate) -> SideFeatures {
        let Some(last_date) = self.last_date else {
            return SideFeatures::SEASON_OPENER;
        };
        let rest = rest_days(last_date, date);
        let opener = SideFeatures::SEASON_OPENER;
        SideFeatures {
            home_win_pct: win_pct(self.home_wins, self.home_losses),
            away_win_pct: win_pct(self.road_wins, self.road_losses),
            total_win_pct: win_pct(self.wins, self.losses),
            rest_days: rest,
            back_to_back: if rest == 1.0 { 1.0 } else { 0.0 },
            rolling_oe: self.offensive_efficiency.mean().unwrap_or(opener.rolling_oe),
            rolling_scoring_margin: self
                .scoring_margin
                .mean()
                .unwrap_or(opener.rolling_scoring_margin),
            rolling_fg_pct: self.fg_pct.mean().unwrap_or(opener.rolling_fg_pct),
            last_3_wins: self.recent_wins.sum(),
        }
    }

    /// Fold a completed game into the running totals
    pub fn update(&mut self, record: &TeamGameRecord) {
        self.wins += record.wins;
        self.losses += record.losses;
        self.home_wins += record.home_wins;
        self.home_losses += record.home_losses;
        self.road_wins += record.road_wins;
        self.road_losses += record.road_losses;
        self.last_date = Some(record.date);
        self.offensive_efficiency.push(record.offensive_efficiency);
        self.scoring_margin.push(record.scoring_margin);
        self.fg_pct.push(record.fg_pct);
        self.recent_wins.push(record.wins as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::history::tests::record;
    use crate::Role;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, d).unwrap()
    }

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let mut window = RollingWindow::new(3);
        assert_eq!(window.mean(), None);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 9.0);
        assert_eq!(window.mean(), Some(3.0));
    }

    #[test]
    fn test_partial_window_mean() {
        let mut window = RollingWindow::new(ROLLING_WINDOW);
        window.push(0.5);
        window.push(0.7);
        assert!((window.mean().unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_win_pct_guards_zero() {
        assert_eq!(win_pct(0, 0), 0.0);
        assert_eq!(win_pct(2, 1), 2.0 / 3.0);
    }

    #[test]
    fn test_rest_days_capped() {
        assert_eq!(rest_days(day(1), day(2)), 1.0);
        let summer = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(rest_days(summer, day(1)), 30.0);
    }

    #[test]
    fn test_opener_snapshot() {
        let form = SeasonForm::new();
        assert_eq!(form.snapshot(day(1)), SideFeatures::SEASON_OPENER);
    }

    #[test]
    fn test_snapshot_after_games() {
        let mut form = SeasonForm::new();
        form.update(&record(1, 1, Role::Home, day(1), true));
        form.update(&record(2, 1, Role::Away, day(3), false));
        form.update(&record(3, 1, Role::Home, day(4), true));

        let snap = form.snapshot(day(5));
        assert!((snap.total_win_pct - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(snap.home_win_pct, 1.0);
        assert_eq!(snap.away_win_pct, 0.0);
        assert_eq!(snap.rest_days, 1.0);
        assert_eq!(snap.back_to_back, 1.0);
        assert_eq!(snap.last_3_wins, 2.0);
        assert!((snap.rolling_scoring_margin - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_form_window_keeps_last_three() {
        let mut form = SeasonForm::new();
        let results = [true, true, true, false, false];
        for (i, won) in results.iter().enumerate() {
            form.update(&record(i as u64, 1, Role::Home, day(i as u32 + 1), *won));
        }
        let snap = form.snapshot(day(10));
        assert_eq!(snap.last_3_wins, 1.0);
        assert_eq!(form.games(), 5);
    }
}
