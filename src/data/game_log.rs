//! Game log CSV ingestion and training-table export
//!
//! The log has one row per team per game. Which row of a pair is the away
//! side comes from an `IS_OPPONENT` flag or, in older exports, a `CITY`
//! value of `OPPONENTS`.

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use crate::features::{TrainingRow, FEATURE_COLUMNS};
use crate::{CourtsideError, GameId, Result, Role, TeamGameRecord, TeamId};

/// Columns every game log must carry
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "GAME_ID",
    "TEAM_ID",
    "SEASON",
    "GAME_DATE",
    "W",
    "L",
    "W_HOME",
    "L_HOME",
    "W_ROAD",
    "L_ROAD",
    "OFFENSIVE_EFFICIENCY",
    "SCORING_MARGIN",
    "FG_PCT",
];

const OPPONENT_CITY: &str = "OPPONENTS";

#[derive(Debug, Clone, Copy)]
enum AwayMarker {
    Flag(usize),
    City(usize),
}

/// Reads team game records from a CSV game log
pub struct GameLogReader {
    columns: HashMap<String, usize>,
    marker: AwayMarker,
    points: Option<usize>,
}

impl GameLogReader {
    /// Validate a header row and remember column positions
    pub fn from_headers(headers: &StringRecord) -> Result<Self> {
        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_uppercase(), i))
            .collect();

        for column in REQUIRED_COLUMNS {
            if !columns.contains_key(column) {
                return Err(CourtsideError::schema(column, "missing required column"));
            }
        }

        let marker = if let Some(&i) = columns.get("IS_OPPONENT") {
            AwayMarker::Flag(i)
        } else if let Some(&i) = columns.get("CITY") {
            AwayMarker::City(i)
        } else {
            return Err(CourtsideError::schema(
                "IS_OPPONENT",
                "log needs an IS_OPPONENT or CITY column to mark the away row",
            ));
        };

        let points = columns.get("PTS").copied();
        Ok(GameLogReader {
            columns,
            marker,
            points,
        })
    }

    /// Read every record from a CSV file
    pub fn read_path<P: AsRef<Path>>(path: P) -> Result<Vec<TeamGameRecord>> {
        let reader = csv::Reader::from_path(path.as_ref())?;
        let records = Self::read_csv(reader)?;
        log::info!(
            "Read {} game log rows from {}",
            records.len(),
            path.as_ref().display()
        );
        Ok(records)
    }

    /// Read every record from any CSV source
    pub fn read_from<R: Read>(source: R) -> Result<Vec<TeamGameRecord>> {
        Self::read_csv(csv::Reader::from_reader(source))
    }

    fn read_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<TeamGameRecord>> {
        let parser = Self::from_headers(reader.headers()?)?;
        let mut records = Vec::new();
        for row in reader.records() {
            records.push(parser.parse(&row?)?);
        }
        Ok(records)
    }

    fn field<'r>(&self, row: &'r StringRecord, column: &str) -> Result<&'r str> {
        let index = self
            .columns
            .get(column)
            .ok_or_else(|| CourtsideError::schema(column, "missing required column"))?;
        row.get(*index)
            .map(str::trim)
            .ok_or_else(|| CourtsideError::schema(column, "row is shorter than the header"))
    }

    fn float(&self, row: &StringRecord, column: &str) -> Result<f64> {
        let raw = self.field(row, column)?;
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(CourtsideError::schema(
                column,
                format!("not a finite number: {:?}", raw),
            )),
        }
    }

    /// Counts may be written as `1` or `1.0`
    fn count(&self, row: &StringRecord, column: &str) -> Result<u32> {
        let value = self.float(row, column)?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(CourtsideError::schema(
                column,
                format!("expected a non-negative count, got {}", value),
            ));
        }
        Ok(value as u32)
    }

    /// Parse one data row
    pub fn parse(&self, row: &StringRecord) -> Result<TeamGameRecord> {
        let raw_id = self.field(row, "GAME_ID")?;
        let game_id = raw_id
            .parse::<u64>()
            .map_err(|_| CourtsideError::schema("GAME_ID", format!("bad game id {:?}", raw_id)))?;
        let raw_team = self.field(row, "TEAM_ID")?;
        let team_id = raw_team
            .parse::<i64>()
            .map_err(|_| CourtsideError::schema("TEAM_ID", format!("bad team id {:?}", raw_team)))?;

        let role = match self.marker {
            AwayMarker::Flag(i) => match row.get(i).map(str::trim) {
                Some("1") | Some("1.0") | Some("true") | Some("True") => Role::Away,
                Some("0") | Some("0.0") | Some("false") | Some("False") => Role::Home,
                other => {
                    return Err(CourtsideError::schema(
                        "IS_OPPONENT",
                        format!("expected 0 or 1, got {:?}", other),
                    ))
                }
            },
            AwayMarker::City(i) => {
                if row.get(i).map(str::trim) == Some(OPPONENT_CITY) {
                    Role::Away
                } else {
                    Role::Home
                }
            }
        };

        let points = match self.points.and_then(|i| row.get(i)).map(str::trim) {
            None | Some("") => None,
            Some(_) => Some(self.count(row, "PTS")?),
        };

        Ok(TeamGameRecord {
            game_id: GameId(game_id),
            team_id: TeamId(team_id),
            season: self.field(row, "SEASON")?.to_string(),
            date: parse_game_date(self.field(row, "GAME_DATE")?)?,
            role,
            wins: self.count(row, "W")?,
            losses: self.count(row, "L")?,
            home_wins: self.count(row, "W_HOME")?,
            home_losses: self.count(row, "L_HOME")?,
            road_wins: self.count(row, "W_ROAD")?,
            road_losses: self.count(row, "L_ROAD")?,
            offensive_efficiency: self.float(row, "OFFENSIVE_EFFICIENCY")?,
            scoring_margin: self.float(row, "SCORING_MARGIN")?,
            fg_pct: self.float(row, "FG_PCT")?,
            points,
        })
    }
}

/// Parse the date formats seen in NBA exports
pub fn parse_game_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%b %d, %Y") {
        return Ok(date);
    }
    Err(CourtsideError::schema(
        "GAME_DATE",
        format!("unrecognised date {:?}", raw),
    ))
}

/// Header of the exported training table
pub fn training_table_header() -> Vec<String> {
    let mut header = vec!["GAME_ID".to_string(), "SEASON".to_string()];
    header.extend(FEATURE_COLUMNS.iter().map(|c| c.to_string()));
    header.extend(["HOME_W", "HOME_PTS", "AWAY_PTS"].map(String::from));
    header
}

/// Write batch feature rows as CSV in the fixed column order
pub fn write_training_table<W: Write>(rows: &[TrainingRow], sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(training_table_header())?;
    for row in rows {
        let mut fields = vec![row.game_id.to_string(), row.season.clone()];
        fields.extend(row.features.to_vec().iter().map(|v| v.to_string()));
        fields.push((row.home_won as u8).to_string());
        fields.push(row.home_points.map(|p| p.to_string()).unwrap_or_default());
        fields.push(row.away_points.map(|p| p.to_string()).unwrap_or_default());
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the training table to a file
pub fn write_training_table_path<P: AsRef<Path>>(rows: &[TrainingRow], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = std::fs::File::create(path)?;
    write_training_table(rows, file)?;
    log::info!("Wrote {} training rows to {}", rows.len(), path.display());
    Ok(())
}
