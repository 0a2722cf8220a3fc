//! NBA game prediction from point-in-time team features
//!
//! Derives causal rolling/cumulative features from per-team game logs and
//! serves win probabilities and score predictions for upcoming matchups.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Unique identifier for a team (NBA API team id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // NBA game ids are ten digits with leading zeros
        write!(f, "{:010}", self.0)
    }
}

/// Which side of a game a log row describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Home,
    /// The designated away/opponent row of the game pair
    Away,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Home => write!(f, "home"),
            Role::Away => write!(f, "away"),
        }
    }
}

/// One team's box-score line for one game.
///
/// The win/loss fields are per-game flags (0 or 1) exactly as they appear
/// in the source log; `home_*`/`road_*` are the venue splits of the same
/// result. Uniquely identified by `(game_id, team_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGameRecord {
    pub game_id: GameId,
    pub team_id: TeamId,
    pub season: String,
    pub date: NaiveDate,
    pub role: Role,
    pub wins: u32,
    pub losses: u32,
    pub home_wins: u32,
    pub home_losses: u32,
    pub road_wins: u32,
    pub road_losses: u32,
    pub offensive_efficiency: f64,
    pub scoring_margin: f64,
    pub fg_pct: f64,
    /// Final points, when the log carries them (score model targets)
    pub points: Option<u32>,
}

impl TeamGameRecord {
    /// Check if this team won the game
    pub fn won(&self) -> bool {
        self.wins > 0
    }

    /// Check if this row is the home participant of the game
    pub fn is_home(&self) -> bool {
        self.role == Role::Home
    }
}

/// Recommendation tier chosen from prediction confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongBet,
    ModerateLean,
    SlightEdge,
    CoinFlip,
}

impl Recommendation {
    /// Bands are inclusive at their lower bound
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.7 {
            Recommendation::StrongBet
        } else if confidence >= 0.4 {
            Recommendation::ModerateLean
        } else if confidence >= 0.2 {
            Recommendation::SlightEdge
        } else {
            Recommendation::CoinFlip
        }
    }

    /// Human readable recommendation naming the favoured team
    pub fn describe(&self, winner: &str, confidence: f64) -> String {
        let pct = confidence * 100.0;
        match self {
            Recommendation::StrongBet => {
                format!("Strong bet on {} (confidence: {:.0}%)", winner, pct)
            }
            Recommendation::ModerateLean => {
                format!("Moderate lean towards {} (confidence: {:.0}%)", winner, pct)
            }
            Recommendation::SlightEdge => {
                format!("Slight edge for {}, risky (confidence: {:.0}%)", winner, pct)
            }
            Recommendation::CoinFlip => "Coin flip — no strong recommendation".to_string(),
        }
    }
}

/// Output of a single game prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Listing id when the prediction came from a batch of listings
    pub game_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_win_prob: f64,
    pub away_win_prob: f64,
    pub predicted_winner: String,
    /// `|home_win_prob - 0.5| * 2`, in [0, 1]
    pub confidence: f64,
    pub predicted_home_score: Option<i32>,
    pub predicted_away_score: Option<i32>,
    pub predicted_total: Option<i32>,
    pub predicted_margin: Option<f64>,
    pub tier: Recommendation,
    pub recommendation: String,
    pub model_type: String,
    pub features_used: usize,
    /// Set when no trained classifier was available
    pub is_placeholder: bool,
}

impl PredictionResult {
    /// Result returned while no classifier is loaded
    pub fn placeholder(home_team: &str, away_team: &str) -> Self {
        PredictionResult {
            game_id: None,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_win_prob: 0.5,
            away_win_prob: 0.5,
            predicted_winner: "uncertain".to_string(),
            confidence: 0.0,
            predicted_home_score: None,
            predicted_away_score: None,
            predicted_total: None,
            predicted_margin: None,
            tier: Recommendation::CoinFlip,
            recommendation: "Model not yet trained, run `courtside train` first.".to_string(),
            model_type: "none".to_string(),
            features_used: 0,
            is_placeholder: true,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum CourtsideError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema error in {column}: {message}")]
    Schema { column: String, message: String },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Model not trained - run `courtside train` first")]
    NoModel,

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CourtsideError {
    pub fn schema(column: impl Into<String>, message: impl Into<String>) -> Self {
        CourtsideError::Schema {
            column: column.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CourtsideError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub classifier_path: String,
    pub score_model_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Season label used for live predictions
    pub current_season: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub test_fraction: f64,
    pub seed: u64,
    pub log_every: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                database_path: "data/courtside.db".to_string(),
                classifier_path: "model/nba_classifier.json".to_string(),
                score_model_path: "model/nba_score_model.json".to_string(),
            },
            features: FeatureConfig {
                current_season: "2025-26".to_string(),
            },
            training: TrainingConfig {
                epochs: 400,
                learning_rate: 0.1,
                test_fraction: 0.2,
                seed: 42,
                log_every: 50,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CourtsideError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| CourtsideError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CourtsideError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
