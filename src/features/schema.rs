//! Fixed feature schemas
//!
//! A [`FeatureRow`] is the full 27-column description of one matchup. The
//! classifier and the score regressors each consume their own ordered subset,
//! modelled as [`ClassifierFeatures`] and [`RegressorFeatures`].

use serde::{Deserialize, Serialize};

use super::head_to_head::HeadToHead;
use crate::{CourtsideError, Result};

/// Per-side column names, without the `HOME_`/`AWAY_` prefix
pub const SIDE_COLUMNS: [&str; 9] = [
    "LAST_GAME_HOME_WIN_PCTG",
    "LAST_GAME_AWAY_WIN_PCTG",
    "LAST_GAME_TOTAL_WIN_PCTG",
    "NUM_REST_DAYS",
    "IS_BACK_TO_BACK",
    "LAST_GAME_ROLLING_OE",
    "LAST_GAME_ROLLING_SCORING_MARGIN",
    "LAST_GAME_ROLLING_FG_PCT",
    "LAST_GAME_LAST_3_WINS",
];

/// Column order of a [`FeatureRow`] and of the exported training table
pub const FEATURE_COLUMNS: [&str; 27] = [
    "HOME_LAST_GAME_HOME_WIN_PCTG",
    "HOME_LAST_GAME_AWAY_WIN_PCTG",
    "HOME_LAST_GAME_TOTAL_WIN_PCTG",
    "HOME_NUM_REST_DAYS",
    "HOME_IS_BACK_TO_BACK",
    "HOME_LAST_GAME_ROLLING_OE",
    "HOME_LAST_GAME_ROLLING_SCORING_MARGIN",
    "HOME_LAST_GAME_ROLLING_FG_PCT",
    "HOME_LAST_GAME_LAST_3_WINS",
    "AWAY_LAST_GAME_HOME_WIN_PCTG",
    "AWAY_LAST_GAME_AWAY_WIN_PCTG",
    "AWAY_LAST_GAME_TOTAL_WIN_PCTG",
    "AWAY_NUM_REST_DAYS",
    "AWAY_IS_BACK_TO_BACK",
    "AWAY_LAST_GAME_ROLLING_OE",
    "AWAY_LAST_GAME_ROLLING_SCORING_MARGIN",
    "AWAY_LAST_GAME_ROLLING_FG_PCT",
    "AWAY_LAST_GAME_LAST_3_WINS",
    "H2H_HOME_WIN_PCT",
    "H2H_HOME_AVG_MARGIN",
    "WIN_PCTG_DIFF",
    "OE_DIFF",
    "SCORING_MARGIN_DIFF",
    "REST_DIFF",
    "HOME_ADVANTAGE",
    "FG_PCT_DIFF",
    "FORM_DIFF",
];

/// One team's form going into a game
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideFeatures {
    /// Win rate in home-role games so far this season
    pub home_win_pct: f64,
    /// Win rate in away-role games so far this season
    pub away_win_pct: f64,
    pub total_win_pct: f64,
    /// Days since the previous game, capped at 30
    pub rest_days: f64,
    /// 1.0 when `rest_days == 1`
    pub back_to_back: f64,
    pub rolling_oe: f64,
    pub rolling_scoring_margin: f64,
    pub rolling_fg_pct: f64,
    /// Wins over the last three games
    pub last_3_wins: f64,
}

impl SideFeatures {
    /// Uninformative prior used when a matchup has no usable history
    pub const NEUTRAL: SideFeatures = SideFeatures {
        home_win_pct: 0.5,
        away_win_pct: 0.5,
        total_win_pct: 0.5,
        rest_days: 2.0,
        back_to_back: 0.0,
        rolling_oe: 0.5,
        rolling_scoring_margin: 0.0,
        rolling_fg_pct: 0.45,
        last_3_wins: 1.5,
    };

    /// Values for a team's first game of a season in the training table
    pub const SEASON_OPENER: SideFeatures = SideFeatures {
        home_win_pct: 0.5,
        away_win_pct: 0.5,
        total_win_pct: 0.5,
        rest_days: 7.0,
        back_to_back: 0.0,
        rolling_oe: 0.5,
        rolling_scoring_margin: 0.0,
        rolling_fg_pct: 0.45,
        last_3_wins: 1.0,
    };

    /// Values in [`SIDE_COLUMNS`] order
    pub fn to_array(&self) -> [f64; 9] {
        [
            self.home_win_pct,
            self.away_win_pct,
            self.total_win_pct,
            self.rest_days,
            self.back_to_back,
            self.rolling_oe,
            self.rolling_scoring_margin,
            self.rolling_fg_pct,
            self.last_3_wins,
        ]
    }

    /// Look up a value by its unprefixed column name
    pub fn get(&self, column: &str) -> Option<f64> {
        SIDE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.to_array()[i])
    }

    fn fields_mut(&mut self) -> [&mut f64; 9] {
        [
            &mut self.home_win_pct,
            &mut self.away_win_pct,
            &mut self.total_win_pct,
            &mut self.rest_days,
            &mut self.back_to_back,
            &mut self.rolling_oe,
            &mut self.rolling_scoring_margin,
            &mut self.rolling_fg_pct,
            &mut self.last_3_wins,
        ]
    }
}

/// Full feature description of one matchup as of a date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub home: SideFeatures,
    pub away: SideFeatures,
    pub h2h_home_win_pct: f64,
    pub h2h_home_avg_margin: f64,
    pub win_pctg_diff: f64,
    pub oe_diff: f64,
    pub scoring_margin_diff: f64,
    pub rest_diff: f64,
    /// Home team's home win rate minus its own away win rate
    pub home_advantage: f64,
    pub fg_pct_diff: f64,
    pub form_diff: f64,
}

impl FeatureRow {
    /// Combine both sides and the head-to-head summary, deriving the
    /// differential columns
    pub fn assemble(home: SideFeatures, away: SideFeatures, h2h: HeadToHead) -> Self {
        FeatureRow {
            home,
            away,
            h2h_home_win_pct: h2h.win_pct,
            h2h_home_avg_margin: h2h.avg_margin,
            win_pctg_diff: home.total_win_pct - away.total_win_pct,
            oe_diff: home.rolling_oe - away.rolling_oe,
            scoring_margin_diff: home.rolling_scoring_margin - away.rolling_scoring_margin,
            rest_diff: home.rest_days - away.rest_days,
            home_advantage: home.home_win_pct - home.away_win_pct,
            fg_pct_diff: home.rolling_fg_pct - away.rolling_fg_pct,
            form_diff: home.last_3_wins - away.last_3_wins,
        }
    }

    /// The all-neutral row served when either side lacks history
    pub fn neutral() -> Self {
        FeatureRow {
            home: SideFeatures::NEUTRAL,
            away: SideFeatures::NEUTRAL,
            h2h_home_win_pct: 0.5,
            h2h_home_avg_margin: 0.0,
            win_pctg_diff: 0.0,
            oe_diff: 0.0,
            scoring_margin_diff: 0.0,
            rest_diff: 0.0,
            home_advantage: 0.0,
            fg_pct_diff: 0.0,
            form_diff: 0.0,
        }
    }

    /// Values in [`FEATURE_COLUMNS`] order
    pub fn to_vec(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(FEATURE_COLUMNS.len());
        values.extend(self.home.to_array());
        values.extend(self.away.to_array());
        values.extend([
            self.h2h_home_win_pct,
            self.h2h_home_avg_margin,
            self.win_pctg_diff,
            self.oe_diff,
            self.scoring_margin_diff,
            self.rest_diff,
            self.home_advantage,
            self.fg_pct_diff,
            self.form_diff,
        ]);
        values
    }

    /// Look up a value by column name
    pub fn get(&self, column: &str) -> Option<f64> {
        FEATURE_COLUMNS
            .iter()
            .position(|c| *c == column)
            .map(|i| self.to_vec()[i])
    }

    /// Replace NaN and infinite values
    pub fn fill_non_finite(&mut self, value: f64) {
        let mut fields: Vec<&mut f64> = Vec::with_capacity(FEATURE_COLUMNS.len());
        fields.extend(self.home.fields_mut());
        fields.extend(self.away.fields_mut());
        fields.extend([
            &mut self.h2h_home_win_pct,
            &mut self.h2h_home_avg_margin,
            &mut self.win_pctg_diff,
            &mut self.oe_diff,
            &mut self.scoring_margin_diff,
            &mut self.rest_diff,
            &mut self.home_advantage,
            &mut self.fg_pct_diff,
            &mut self.form_diff,
        ]);
        for field in fields {
            if !field.is_finite() {
                *field = value;
            }
        }
    }
}

/// An ordered subset of [`FeatureRow`] consumed by one model
pub trait FeatureSchema: Sized {
    /// Documented column order
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &FeatureRow) -> Self;

    /// Values in [`Self::COLUMNS`] order
    fn to_vec(&self) -> Vec<f64>;

    /// Owned copy of the column list, as stored in model artifacts
    fn column_names() -> Vec<String> {
        Self::COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    /// Verify a stored feature list against the documented columns
    fn check_columns(names: &[String]) -> Result<()> {
        if names.len() != Self::COLUMNS.len() {
            return Err(CourtsideError::schema(
                "features",
                format!(
                    "expected {} features, found {}",
                    Self::COLUMNS.len(),
                    names.len()
                ),
            ));
        }
        for (i, (found, expected)) in names.iter().zip(Self::COLUMNS).enumerate() {
            if found != expected {
                return Err(CourtsideError::schema(
                    found.clone(),
                    format!("feature {} should be {}", i, expected),
                ));
            }
        }
        Ok(())
    }
}

/// Inputs of the win/loss classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierFeatures {
    pub home_last_game_home_win_pctg: f64,
    pub home_last_game_away_win_pctg: f64,
    pub home_num_rest_days: f64,
    pub home_last_game_rolling_scoring_margin: f64,
    pub home_last_game_rolling_fg_pct: f64,
    pub away_last_game_away_win_pctg: f64,
    pub away_num_rest_days: f64,
    pub away_last_game_rolling_oe: f64,
    pub away_last_game_rolling_scoring_margin: f64,
    pub h2h_home_avg_margin: f64,
    pub home_advantage: f64,
    pub fg_pct_diff: f64,
}

impl FeatureSchema for ClassifierFeatures {
    const COLUMNS: &'static [&'static str] = &[
        "HOME_LAST_GAME_HOME_WIN_PCTG",
        "HOME_LAST_GAME_AWAY_WIN_PCTG",
        "HOME_NUM_REST_DAYS",
        "HOME_LAST_GAME_ROLLING_SCORING_MARGIN",
        "HOME_LAST_GAME_ROLLING_FG_PCT",
        "AWAY_LAST_GAME_AWAY_WIN_PCTG",
        "AWAY_NUM_REST_DAYS",
        "AWAY_LAST_GAME_ROLLING_OE",
        "AWAY_LAST_GAME_ROLLING_SCORING_MARGIN",
        "H2H_HOME_AVG_MARGIN",
        "HOME_ADVANTAGE",
        "FG_PCT_DIFF",
    ];

    fn from_row(row: &FeatureRow) -> Self {
        ClassifierFeatures {
            home_last_game_home_win_pctg: row.home.home_win_pct,
            home_last_game_away_win_pctg: row.home.away_win_pct,
            home_num_rest_days: row.home.rest_days,
            home_last_game_rolling_scoring_margin: row.home.rolling_scoring_margin,
            home_last_game_rolling_fg_pct: row.home.rolling_fg_pct,
            away_last_game_away_win_pctg: row.away.away_win_pct,
            away_num_rest_days: row.away.rest_days,
            away_last_game_rolling_oe: row.away.rolling_oe,
            away_last_game_rolling_scoring_margin: row.away.rolling_scoring_margin,
            h2h_home_avg_margin: row.h2h_home_avg_margin,
            home_advantage: row.home_advantage,
            fg_pct_diff: row.fg_pct_diff,
        }
    }

    fn to_vec(&self) -> Vec<f64> {
        vec![
            self.home_last_game_home_win_pctg,
            self.home_last_game_away_win_pctg,
            self.home_num_rest_days,
            self.home_last_game_rolling_scoring_margin,
            self.home_last_game_rolling_fg_pct,
            self.away_last_game_away_win_pctg,
            self.away_num_rest_days,
            self.away_last_game_rolling_oe,
            self.away_last_game_rolling_scoring_margin,
            self.h2h_home_avg_margin,
            self.home_advantage,
            self.fg_pct_diff,
        ]
    }
}

/// Inputs of the home and away score regressors.
///
/// Same columns as [`FeatureRow`] but in the regressors' own order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressorFeatures {
    pub home_last_game_home_win_pctg: f64,
    pub home_last_game_away_win_pctg: f64,
    pub home_last_game_total_win_pctg: f64,
    pub home_num_rest_days: f64,
    pub home_is_back_to_back: f64,
    pub home_last_game_rolling_scoring_margin: f64,
    pub home_last_game_rolling_fg_pct: f64,
    pub home_last_game_rolling_oe: f64,
    pub home_last_game_last_3_wins: f64,
    pub away_last_game_away_win_pctg: f64,
    pub away_last_game_home_win_pctg: f64,
    pub away_last_game_total_win_pctg: f64,
    pub away_num_rest_days: f64,
    pub away_is_back_to_back: f64,
    pub away_last_game_rolling_oe: f64,
    pub away_last_game_rolling_scoring_margin: f64,
    pub away_last_game_rolling_fg_pct: f64,
    pub away_last_game_last_3_wins: f64,
    pub h2h_home_avg_margin: f64,
    pub h2h_home_win_pct: f64,
    pub home_advantage: f64,
    pub fg_pct_diff: f64,
    pub oe_diff: f64,
    pub scoring_margin_diff: f64,
    pub win_pctg_diff: f64,
    pub form_diff: f64,
    pub rest_diff: f64,
}

impl FeatureSchema for RegressorFeatures {
    const COLUMNS: &'static [&'static str] = &[
        "HOME_LAST_GAME_HOME_WIN_PCTG",
        "HOME_LAST_GAME_AWAY_WIN_PCTG",
        "HOME_LAST_GAME_TOTAL_WIN_PCTG",
        "HOME_NUM_REST_DAYS",
        "HOME_IS_BACK_TO_BACK",
        "HOME_LAST_GAME_ROLLING_SCORING_MARGIN",
        "HOME_LAST_GAME_ROLLING_FG_PCT",
        "HOME_LAST_GAME_ROLLING_OE",
        "HOME_LAST_GAME_LAST_3_WINS",
        "AWAY_LAST_GAME_AWAY_WIN_PCTG",
        "AWAY_LAST_GAME_HOME_WIN_PCTG",
        "AWAY_LAST_GAME_TOTAL_WIN_PCTG",
        "AWAY_NUM_REST_DAYS",
        "AWAY_IS_BACK_TO_BACK",
        "AWAY_LAST_GAME_ROLLING_OE",
        "AWAY_LAST_GAME_ROLLING_SCORING_MARGIN",
        "AWAY_LAST_GAME_ROLLING_FG_PCT",
        "AWAY_LAST_GAME_LAST_3_WINS",
        "H2H_HOME_AVG_MARGIN",
        "H2H_HOME_WIN_PCT",
        "HOME_ADVANTAGE",
        "FG_PCT_DIFF",
        "OE_DIFF",
        "SCORING_MARGIN_DIFF",
        "WIN_PCTG_DIFF",
        "FORM_DIFF",
        "REST_DIFF",
    ];

    fn from_row(row: &FeatureRow) -> Self {
        RegressorFeatures {
            home_last_game_home_win_pctg: row.home.home_win_pct,
            home_last_game_away_win_pctg: row.home.away_win_pct,
            home_last_game_total_win_pctg: row.home.total_win_pct,
            home_num_rest_days: row.home.rest_days,
            home_is_back_to_back: row.home.back_to_back,
            home_last_game_rolling_scoring_margin: row.home.rolling_scoring_margin,
            home_last_game_rolling_fg_pct: row.home.rolling_fg_pct,
            home_last_game_rolling_oe: row.home.rolling_oe,
            home_last_game_last_3_wins: row.home.last_3_wins,
            away_last_game_away_win_pctg: row.away.away_win_pct,
            away_last_game_home_win_pctg: row.away.home_win_pct,
            away_last_game_total_win_pctg: row.away.total_win_pct,
            away_num_rest_days: row.away.rest_days,
            away_is_back_to_back: row.away.back_to_back,
            away_last_game_rolling_oe: row.away.rolling_oe,
            away_last_game_rolling_scoring_margin: row.away.rolling_scoring_margin,
            away_last_game_rolling_fg_pct: row.away.rolling_fg_pct,
            away_last_game_last_3_wins: row.away.last_3_wins,
            h2h_home_avg_margin: row.h2h_home_avg_margin,
            h2h_home_win_pct: row.h2h_home_win_pct,
            home_advantage: row.home_advantage,
            fg_pct_diff: row.fg_pct_diff,
            oe_diff: row.oe_diff,
            scoring_margin_diff: row.scoring_margin_diff,
            win_pctg_diff: row.win_pctg_diff,
            form_diff: row.form_diff,
            rest_diff: row.rest_diff,
        }
    }

    fn to_vec(&self) -> Vec<f64> {
        vec![
            self.home_last_game_home_win_pctg,
            self.home_last_game_away_win_pctg,
            self.home_last_game_total_win_pctg,
            self.home_num_rest_days,
            self.home_is_back_to_back,
            self.home_last_game_rolling_scoring_margin,
            self.home_last_game_rolling_fg_pct,
            self.home_last_game_rolling_oe,
            self.home_last_game_last_3_wins,
            self.away_last_game_away_win_pctg,
            self.away_last_game_home_win_pctg,
            self.away_last_game_total_win_pctg,
            self.away_num_rest_days,
            self.away_is_back_to_back,
            self.away_last_game_rolling_oe,
            self.away_last_game_rolling_scoring_margin,
            self.away_last_game_rolling_fg_pct,
            self.away_last_game_last_3_wins,
            self.h2h_home_avg_margin,
            self.h2h_home_win_pct,
            self.home_advantage,
            self.fg_pct_diff,
            self.oe_diff,
            self.scoring_margin_diff,
            self.win_pctg_diff,
            self.form_diff,
            self.rest_diff,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> FeatureRow {
        let home = SideFeatures {
            home_win_pct: 0.75,
            away_win_pct: 0.5,
            total_win_pct: 2.0 / 3.0,
            rest_days: 2.0,
            back_to_back: 0.0,
            rolling_oe: 0.58,
            rolling_scoring_margin: 4.2,
            rolling_fg_pct: 0.48,
            last_3_wins: 2.0,
        };
        let away = SideFeatures {
            home_win_pct: 0.25,
            away_win_pct: 0.4,
            total_win_pct: 1.0 / 3.0,
            rest_days: 1.0,
            back_to_back: 1.0,
            rolling_oe: 0.51,
            rolling_scoring_margin: -3.0,
            rolling_fg_pct: 0.44,
            last_3_wins: 1.0,
        };
        FeatureRow::assemble(
            home,
            away,
            HeadToHead {
                win_pct: 1.0,
                avg_margin: 7.5,
                meetings: 2,
            },
        )
    }

    #[test]
    fn test_differentials() {
        let row = sample_row();
        assert!((row.win_pctg_diff - 1.0 / 3.0).abs() < 1e-12);
        assert!((row.oe_diff - 0.07).abs() < 1e-12);
        assert!((row.scoring_margin_diff - 7.2).abs() < 1e-12);
        assert_eq!(row.rest_diff, 1.0);
        assert!((row.home_advantage - 0.25).abs() < 1e-12);
        assert!((row.fg_pct_diff - 0.04).abs() < 1e-12);
        assert_eq!(row.form_diff, 1.0);
    }

    #[test]
    fn test_vector_follows_column_order() {
        let row = sample_row();
        let values = row.to_vec();
        assert_eq!(values.len(), FEATURE_COLUMNS.len());
        for (i, column) in FEATURE_COLUMNS.iter().enumerate() {
            assert_eq!(row.get(column), Some(values[i]), "{}", column);
        }
        assert_eq!(row.get("HOME_NUM_REST_DAYS"), Some(2.0));
        assert_eq!(row.get("AWAY_IS_BACK_TO_BACK"), Some(1.0));
        assert_eq!(row.get("H2H_HOME_AVG_MARGIN"), Some(7.5));
        assert_eq!(row.get("NOT_A_COLUMN"), None);
    }

    #[test]
    fn test_subsets_pick_named_columns() {
        let row = sample_row();

        let classifier = ClassifierFeatures::from_row(&row).to_vec();
        assert_eq!(classifier.len(), 12);
        for (value, column) in classifier.iter().zip(ClassifierFeatures::COLUMNS) {
            assert_eq!(Some(*value), row.get(column), "{}", column);
        }

        let regressor = RegressorFeatures::from_row(&row).to_vec();
        assert_eq!(regressor.len(), 27);
        for (value, column) in regressor.iter().zip(RegressorFeatures::COLUMNS) {
            assert_eq!(Some(*value), row.get(column), "{}", column);
        }
    }

    #[test]
    fn test_regressor_columns_are_a_permutation() {
        let mut regressor: Vec<_> = RegressorFeatures::COLUMNS.to_vec();
        let mut full: Vec<_> = FEATURE_COLUMNS.to_vec();
        regressor.sort();
        full.sort();
        assert_eq!(regressor, full);
        assert_ne!(RegressorFeatures::COLUMNS, &FEATURE_COLUMNS[..]);
    }

    #[test]
    fn test_check_columns() {
        assert!(ClassifierFeatures::check_columns(&ClassifierFeatures::column_names()).is_ok());

        let mut swapped = ClassifierFeatures::column_names();
        swapped.swap(0, 1);
        assert!(ClassifierFeatures::check_columns(&swapped).is_err());

        let short = RegressorFeatures::column_names()[..26].to_vec();
        assert!(RegressorFeatures::check_columns(&short).is_err());
    }

    #[test]
    fn test_neutral_row() {
        let row = FeatureRow::neutral();
        assert_eq!(row.home.rest_days, 2.0);
        assert_eq!(row.away.last_3_wins, 1.5);
        assert_eq!(row.h2h_home_win_pct, 0.5);
        assert!(row.to_vec().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fill_non_finite() {
        let mut row = sample_row();
        row.home.rolling_oe = f64::NAN;
        row.oe_diff = f64::INFINITY;
        row.fill_non_finite(0.0);
        assert_eq!(row.home.rolling_oe, 0.0);
        assert_eq!(row.oe_diff, 0.0);
        assert_eq!(row.home.rest_days, 2.0);
    }
}
