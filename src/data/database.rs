//! SQLite storage for game logs, team aliases and served predictions

use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::Path;

use super::history::TeamGameHistory;
use crate::{GameId, PredictionResult, Result, Role, TeamGameRecord, TeamId};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS game_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                game_id INTEGER NOT NULL,
                team_id INTEGER NOT NULL,
                season TEXT NOT NULL,
                game_date TEXT NOT NULL,
                role TEXT NOT NULL CHECK (role IN ('home', 'away')),
                w INTEGER NOT NULL,
                l INTEGER NOT NULL,
                w_home INTEGER NOT NULL,
                l_home INTEGER NOT NULL,
                w_road INTEGER NOT NULL,
                l_road INTEGER NOT NULL,
                offensive_efficiency REAL NOT NULL,
                scoring_margin REAL NOT NULL,
                fg_pct REAL NOT NULL,
                pts INTEGER,
                UNIQUE(game_id, team_id)
            );

            CREATE TABLE IF NOT EXISTS team_aliases (
                alias TEXT PRIMARY KEY,
                team_id INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS prediction_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                game_id TEXT,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                home_win_prob REAL NOT NULL,
                away_win_prob REAL NOT NULL,
                predicted_winner TEXT NOT NULL,
                confidence REAL NOT NULL,
                predicted_home_score INTEGER,
                predicted_away_score INTEGER,
                model_type TEXT NOT NULL,
                actual_winner TEXT,
                was_correct INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_game_logs_team_season ON game_logs(team_id, season, game_date);
            CREATE INDEX IF NOT EXISTS idx_game_logs_date ON game_logs(game_date);
            "#,
        )?;
        Ok(())
    }

    // ==================== Game Logs ====================

    /// Insert or replace log rows keyed by (game, team).
    ///
    /// The merged log must still form a valid history; otherwise nothing is
    /// written and the history error is returned.
    pub fn upsert_game_logs(&mut self, records: &[TeamGameRecord]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO game_logs (game_id, team_id, season, game_date, role, w, l,
                                       w_home, l_home, w_road, l_road,
                                       offensive_efficiency, scoring_margin, fg_pct, pts)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                ON CONFLICT(game_id, team_id) DO UPDATE SET
                    season = excluded.season,
                    game_date = excluded.game_date,
                    role = excluded.role,
                    w = excluded.w,
                    l = excluded.l,
                    w_home = excluded.w_home,
                    l_home = excluded.l_home,
                    w_road = excluded.w_road,
                    l_road = excluded.l_road,
                    offensive_efficiency = excluded.offensive_efficiency,
                    scoring_margin = excluded.scoring_margin,
                    fg_pct = excluded.fg_pct,
                    pts = COALESCE(excluded.pts, pts)
                "#,
            )?;
            for record in records {
                stmt.execute(params![
                    record.game_id.0 as i64,
                    record.team_id.0,
                    record.season,
                    record.date.format(DATE_FORMAT).to_string(),
                    record.role.to_string(),
                    record.wins,
                    record.losses,
                    record.home_wins,
                    record.home_losses,
                    record.road_wins,
                    record.road_losses,
                    record.offensive_efficiency,
                    record.scoring_margin,
                    record.fg_pct,
                    record.points,
                ])?;
            }
        }
        TeamGameHistory::from_records(Self::query_game_logs(&tx)?)?;
        tx.commit()?;
        Ok(records.len())
    }

    /// All log rows in insertion order
    pub fn get_game_logs(&self) -> Result<Vec<TeamGameRecord>> {
        Self::query_game_logs(&self.conn)
    }

    fn query_game_logs(conn: &Connection) -> Result<Vec<TeamGameRecord>> {
        let mut stmt = conn.prepare(
            "SELECT game_id, team_id, season, game_date, role, w, l, w_home, l_home,
                    w_road, l_road, offensive_efficiency, scoring_margin, fg_pct, pts
             FROM game_logs
             ORDER BY id",
        )?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Load the stored log as an indexed history
    pub fn load_history(&self) -> Result<TeamGameHistory> {
        TeamGameHistory::from_records(self.get_game_logs()?)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TeamGameRecord> {
        let game_id: i64 = row.get(0)?;
        let date_str: String = row.get(3)?;
        let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
        let role_str: String = row.get(4)?;
        let role = if role_str == "away" {
            Role::Away
        } else {
            Role::Home
        };

        Ok(TeamGameRecord {
            game_id: GameId(game_id as u64),
            team_id: TeamId(row.get(1)?),
            season: row.get(2)?,
            date,
            role,
            wins: row.get(5)?,
            losses: row.get(6)?,
            home_wins: row.get(7)?,
            home_losses: row.get(8)?,
            road_wins: row.get(9)?,
            road_losses: row.get(10)?,
            offensive_efficiency: row.get(11)?,
            scoring_margin: row.get(12)?,
            fg_pct: row.get(13)?,
            points: row.get(14)?,
        })
    }

    // ==================== Team Aliases ====================

    /// Store an extra name for a team
    pub fn add_team_alias(&self, alias: &str, team: TeamId) -> Result<()> {
        self.conn.execute(
            "INSERT INTO team_aliases (alias, team_id) VALUES (?1, ?2)
             ON CONFLICT(alias) DO UPDATE SET team_id = excluded.team_id",
            params![alias.trim().to_lowercase(), team.0],
        )?;
        Ok(())
    }

    pub fn get_team_aliases(&self) -> Result<Vec<(String, TeamId)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT alias, team_id FROM team_aliases ORDER BY alias")?;
        let aliases = stmt
            .query_map([], |row| Ok((row.get(0)?, TeamId(row.get(1)?))))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(aliases)
    }

    // ==================== Prediction Log ====================

    /// Record a served prediction, returning its log id
    pub fn log_prediction(&self, prediction: &PredictionResult) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO prediction_logs (game_id, home_team, away_team, home_win_prob,
                                         away_win_prob, predicted_winner, confidence,
                                         predicted_home_score, predicted_away_score, model_type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                prediction.game_id,
                prediction.home_team,
                prediction.away_team,
                prediction.home_win_prob,
                prediction.away_win_prob,
                prediction.predicted_winner,
                prediction.confidence,
                prediction.predicted_home_score,
                prediction.predicted_away_score,
                prediction.model_type,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fill in the real winner of a logged prediction.
    ///
    /// Returns `false` when no prediction has that id.
    pub fn record_result(&self, prediction_id: i64, actual_winner: &str) -> Result<bool> {
        let predicted: Option<String> = self
            .conn
            .query_row(
                "SELECT predicted_winner FROM prediction_logs WHERE id = ?1",
                params![prediction_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(predicted) = predicted else {
            return Ok(false);
        };

        let correct = predicted.trim().eq_ignore_ascii_case(actual_winner.trim());
        self.conn.execute(
            "UPDATE prediction_logs SET actual_winner = ?1, was_correct = ?2 WHERE id = ?3",
            params![actual_winner, correct, prediction_id],
        )?;
        Ok(true)
    }

    pub fn get_predictions(&self, limit: usize) -> Result<Vec<PredictionLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, game_id, home_team, away_team, home_win_prob,
                    predicted_winner, confidence, model_type, actual_winner, was_correct
             FROM prediction_logs
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(PredictionLogEntry {
                    id: row.get(0)?,
                    created_at: row.get(1)?,
                    game_id: row.get(2)?,
                    home_team: row.get(3)?,
                    away_team: row.get(4)?,
                    home_win_prob: row.get(5)?,
                    predicted_winner: row.get(6)?,
                    confidence: row.get(7)?,
                    model_type: row.get(8)?,
                    actual_winner: row.get(9)?,
                    was_correct: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Hit rate over predictions with a recorded result
    pub fn prediction_accuracy(&self) -> Result<AccuracySummary> {
        let (logged, resolved, correct): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(was_correct), COALESCE(SUM(was_correct), 0) FROM prediction_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok(AccuracySummary {
            logged: logged as usize,
            resolved: resolved as usize,
            correct: correct as usize,
            accuracy: if resolved > 0 {
                Some(correct as f64 / resolved as f64)
            } else {
                None
            },
        })
    }

    // ==================== Statistics ====================

    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let (rows, games, teams): (i64, i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT game_id), COUNT(DISTINCT team_id) FROM game_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        let (min_date, max_date): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(game_date), MAX(game_date) FROM game_logs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT season, COUNT(*) FROM game_logs GROUP BY season ORDER BY season")?;
        let seasons = stmt
            .query_map([], |row| {
                let count: i64 = row.get(1)?;
                Ok((row.get::<_, String>(0)?, count as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let predictions: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM prediction_logs", [], |row| row.get(0))?;

        let parse = |s: Option<String>| s.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok());
        Ok(DatabaseStats {
            game_log_rows: rows as usize,
            games: games as usize,
            teams: teams as usize,
            rows_per_season: seasons,
            earliest_game: parse(min_date),
            latest_game: parse(max_date),
            predictions: predictions as usize,
        })
    }
}

/// A stored prediction
#[derive(Debug, Clone, Serialize)]
pub struct PredictionLogEntry {
    pub id: i64,
    pub created_at: String,
    pub game_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_win_prob: f64,
    pub predicted_winner: String,
    pub confidence: f64,
    pub model_type: String,
    pub actual_winner: Option<String>,
    pub was_correct: Option<bool>,
}

/// Prediction hit rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub logged: usize,
    pub resolved: usize,
    pub correct: usize,
    pub accuracy: Option<f64>,
}

/// Database statistics
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub game_log_rows: usize,
    pub games: usize,
    pub teams: usize,
    pub rows_per_season: Vec<(String, usize)>,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
    pub predictions: usize,
}
