//! Head-to-head summaries of prior meetings
//!
//! A meeting counts when the home team played in the home role and the away
//! team in the away role of the same game, before the cutoff date. Seasons
//! are not restricted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::{GameId, Role, TeamGameRecord, TeamId};

/// Fewest meetings that produce a non-neutral summary
pub const MIN_MEETINGS: usize = 2;
/// Most recent meetings summarised
pub const MAX_MEETINGS: usize = 10;

/// Summary of a pairing's recent meetings, from the home team's side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub win_pct: f64,
    pub avg_margin: f64,
    /// Qualifying meetings found before the cutoff
    pub meetings: usize,
}

impl HeadToHead {
    pub fn neutral(meetings: usize) -> Self {
        HeadToHead {
            win_pct: 0.5,
            avg_margin: 0.0,
            meetings,
        }
    }

    /// Summarise meetings given oldest first as `(wins, margin)` pairs
    fn summarise(meetings: &[(u32, f64)]) -> Self {
        if meetings.len() < MIN_MEETINGS {
            return HeadToHead::neutral(meetings.len());
        }
        let recent = &meetings[meetings.len().saturating_sub(MAX_MEETINGS)..];
        let count = recent.len() as f64;
        let wins: f64 = recent.iter().map(|(w, _)| *w as f64).sum();
        let margin: f64 = recent.iter().map(|(_, m)| *m).sum();
        HeadToHead {
            win_pct: wins / count,
            avg_margin: margin / count,
            meetings: meetings.len(),
        }
    }
}

/// Scans a game log for meetings between two teams
pub struct HeadToHeadResolver;

impl HeadToHeadResolver {
    /// Summarise meetings dated strictly before `before`.
    ///
    /// `history` must be in original log order; meetings on the same date
    /// keep that order.
    pub fn resolve(
        home: TeamId,
        away: TeamId,
        before: NaiveDate,
        history: &[TeamGameRecord],
    ) -> HeadToHead {
        let away_games: HashSet<GameId> = history
            .iter()
            .filter(|r| r.team_id == away && r.role == Role::Away && r.date < before)
            .map(|r| r.game_id)
            .collect();

        let mut meetings: Vec<(NaiveDate, usize, &TeamGameRecord)> = history
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.team_id == home
                    && r.role == Role::Home
                    && r.date < before
                    && away_games.contains(&r.game_id)
            })
            .map(|(i, r)| (r.date, i, r))
            .collect();
        meetings.sort_by_key(|(date, position, _)| (*date, *position));

        let results: Vec<(u32, f64)> = meetings
            .iter()
            .map(|(_, _, r)| (r.wins, r.scoring_margin))
            .collect();
        HeadToHead::summarise(&results)
    }
}

#[derive(Debug, Clone, Copy)]
struct Meeting {
    /// Latest date of the two rows; the meeting counts once this is past
    visible_from: NaiveDate,
    wins: u32,
    margin: f64,
}

/// Precomputed meetings per (home, away) pairing.
///
/// Gives the same answers as [`HeadToHeadResolver::resolve`] over the log
/// it was built from, without rescanning the log per query.
#[derive(Debug, Clone, Default)]
pub struct HeadToHeadIndex {
    pairs: HashMap<(TeamId, TeamId), Vec<Meeting>>,
}

impl HeadToHeadIndex {
    pub fn build(history: &[TeamGameRecord]) -> Self {
        let mut games: HashMap<GameId, (Vec<usize>, Vec<usize>)> = HashMap::new();
        for (i, record) in history.iter().enumerate() {
            let entry = games.entry(record.game_id).or_default();
            match record.role {
                Role::Home => entry.0.push(i),
                Role::Away => entry.1.push(i),
            }
        }

        let mut ordered: HashMap<(TeamId, TeamId), Vec<(NaiveDate, usize, Meeting)>> =
            HashMap::new();
        for (homes, aways) in games.values() {
            for &h in homes {
                for &a in aways {
                    let (home, away) = (&history[h], &history[a]);
                    ordered
                        .entry((home.team_id, away.team_id))
                        .or_default()
                        .push((
                            home.date,
                            h,
                            Meeting {
                                visible_from: home.date.max(away.date),
                                wins: home.wins,
                                margin: home.scoring_margin,
                            },
                        ));
                }
            }
        }

        let pairs = ordered
            .into_iter()
            .map(|(key, mut meetings)| {
                meetings.sort_by_key(|(date, position, _)| (*date, *position));
                (key, meetings.into_iter().map(|(_, _, m)| m).collect())
            })
            .collect();
        HeadToHeadIndex { pairs }
    }

    pub fn resolve(&self, home: TeamId, away: TeamId, before: NaiveDate) -> HeadToHead {
        let results: Vec<(u32, f64)> = self
            .pairs
            .get(&(home, away))
            .map(|meetings| {
                meetings
                    .iter()
                    .filter(|m| m.visible_from < before)
                    .map(|m| (m.wins, m.margin))
                    .collect()
            })
            .unwrap_or_default();
        HeadToHead::summarise(&results)
    }
}
