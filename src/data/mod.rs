//! Data ingestion and storage
//!
//! Game log CSV reading, the in-memory team history index and SQLite
//! persistence.

pub mod database;
pub mod game_log;
pub mod history;

pub use database::{AccuracySummary, Database, DatabaseStats, PredictionLogEntry};
pub use game_log::GameLogReader;
pub use history::{HistoryStats, Matchup, TeamGameHistory};
