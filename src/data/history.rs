//! Chronological per-team game history
//!
//! The store keeps every record in original log order (used for stable
//! tie-breaks) and an index of each team-season ordered by date.

use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{CourtsideError, GameId, Result, Role, TeamGameRecord, TeamId};

/// A game id paired with its home and away rows
#[derive(Debug, Clone, Copy)]
pub struct Matchup<'a> {
    pub home: &'a TeamGameRecord,
    pub away: &'a TeamGameRecord,
}

impl<'a> Matchup<'a> {
    pub fn game_id(&self) -> GameId {
        self.home.game_id
    }

    pub fn date(&self) -> NaiveDate {
        self.home.date
    }

    pub fn season(&self) -> &'a str {
        &self.home.season
    }
}

/// Summary counts for status reporting
#[derive(Debug, Clone, Default)]
pub struct HistoryStats {
    pub rows: usize,
    pub games: usize,
    pub teams: usize,
    pub rows_per_season: BTreeMap<String, usize>,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
}

/// In-memory game log with per team-season ordering
#[derive(Debug, Clone, Default)]
pub struct TeamGameHistory {
    /// Records in original log order
    records: Vec<TeamGameRecord>,
    /// Record positions per (team, season), sorted by date
    seasons: HashMap<(TeamId, String), Vec<usize>>,
    keys: HashSet<(GameId, TeamId)>,
}

impl TeamGameHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from log rows, rejecting duplicate `(game, team)`
    /// pairs and repeated dates within a team-season.
    pub fn from_records(records: Vec<TeamGameRecord>) -> Result<Self> {
        let mut history = TeamGameHistory::new();
        history.append(records)?;
        Ok(history)
    }

    /// Append newly ingested records.
    ///
    /// All or nothing: on error the history is left unchanged.
    pub fn extend(&mut self, records: Vec<TeamGameRecord>) -> Result<()> {
        let mut staged = self.clone();
        staged.append(records)?;
        *self = staged;
        Ok(())
    }

    fn append(&mut self, records: Vec<TeamGameRecord>) -> Result<()> {
        let mut touched = HashSet::new();
        for record in records {
            if !self.keys.insert((record.game_id, record.team_id)) {
                return Err(CourtsideError::schema(
                    "GAME_ID",
                    format!(
                        "duplicate row for game {} and {}",
                        record.game_id, record.team_id
                    ),
                ));
            }
            let key = (record.team_id, record.season.clone());
            self.seasons
                .entry(key.clone())
                .or_default()
                .push(self.records.len());
            touched.insert(key);
            self.records.push(record);
        }

        for key in touched {
            let Some(positions) = self.seasons.get_mut(&key) else {
                continue;
            };
            let records = &self.records;
            // Stable: equal dates keep log order
            positions.sort_by_key(|&i| records[i].date);
            if let Some(pair) = positions
                .windows(2)
                .find(|w| records[w[0]].date == records[w[1]].date)
            {
                return Err(CourtsideError::schema(
                    "GAME_DATE",
                    format!(
                        "{} has two games on {} in season {}",
                        key.0, records[pair[0]].date, key.1
                    ),
                ));
            }
        }
        Ok(())
    }

    /// All records in original log order
    pub fn records(&self) -> &[TeamGameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A team's games within one season, ordered by date
    pub fn team_season(&self, team: TeamId, season: &str) -> Vec<&TeamGameRecord> {
        self.seasons
            .get(&(team, season.to_string()))
            .map(|positions| positions.iter().map(|&i| &self.records[i]).collect())
            .unwrap_or_default()
    }

    /// A team's games within one season dated strictly before `cutoff`
    pub fn team_season_before(
        &self,
        team: TeamId,
        season: &str,
        cutoff: NaiveDate,
    ) -> Vec<&TeamGameRecord> {
        let mut games = self.team_season(team, season);
        let end = games.partition_point(|r| r.date < cutoff);
        games.truncate(end);
        games
    }

    /// Every team-season sequence, ordered by date within each
    pub fn team_seasons(&self) -> Vec<Vec<&TeamGameRecord>> {
        let mut keys: Vec<_> = self.seasons.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| self.seasons[key].iter().map(|&i| &self.records[i]).collect())
            .collect()
    }

    /// Join home and away rows on game id and season.
    ///
    /// Games missing either side are skipped. Ordered by (date, game id).
    pub fn matchups(&self) -> Vec<Matchup<'_>> {
        let mut away_rows: HashMap<(GameId, &str), &TeamGameRecord> = HashMap::new();
        for record in self.records.iter().filter(|r| r.role == Role::Away) {
            away_rows.insert((record.game_id, record.season.as_str()), record);
        }

        let mut matchups: Vec<Matchup<'_>> = self
            .records
            .iter()
            .filter(|r| r.role == Role::Home)
            .filter_map(|home| {
                let away = away_rows.get(&(home.game_id, home.season.as_str()))?;
                if away.date != home.date {
                    log::warn!(
                        "Game {} has mismatched dates ({} vs {}), skipping",
                        home.game_id,
                        home.date,
                        away.date
                    );
                    return None;
                }
                Some(Matchup { home, away })
            })
            .collect();

        matchups.sort_by_key(|m| (m.date(), m.game_id()));
        matchups
    }

    /// Seasons present in the log, sorted
    pub fn seasons(&self) -> Vec<String> {
        let mut seasons: Vec<String> = self
            .seasons
            .keys()
            .map(|(_, season)| season.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        seasons.sort();
        seasons
    }

    pub fn stats(&self) -> HistoryStats {
        let mut stats = HistoryStats {
            rows: self.records.len(),
            ..HistoryStats::default()
        };
        let mut games = HashSet::new();
        let mut teams = HashSet::new();
        for record in &self.records {
            games.insert(record.game_id);
            teams.insert(record.team_id);
            *stats
                .rows_per_season
                .entry(record.season.clone())
                .or_default() += 1;
            stats.earliest = Some(stats.earliest.map_or(record.date, |d| d.min(record.date)));
            stats.latest = Some(stats.latest.map_or(record.date, |d| d.max(record.date)));
        }
        stats.games = games.len();
        stats.teams = teams.len();
        stats
    }
}
