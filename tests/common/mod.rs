//! Synthetic league shared by the integration tests

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use courtside::{GameId, Role, TeamGameRecord, TeamId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::io::Write;

pub const CELTICS: i64 = 1610612738;
pub const KNICKS: i64 = 1610612752;
pub const LAKERS: i64 = 1610612747;
pub const HEAT: i64 = 1610612748;
pub const BUCKS: i64 = 1610612749;
pub const SUNS: i64 = 1610612756;

/// Strongest first
pub const TEAMS: [i64; 6] = [CELTICS, BUCKS, KNICKS, SUNS, HEAT, LAKERS];

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One log row for one side of a game
pub fn side(
    game: u64,
    team: i64,
    season: &str,
    date: NaiveDate,
    role: Role,
    points: u32,
    opponent_points: u32,
) -> TeamGameRecord {
    let won = points > opponent_points;
    let home = role == Role::Home;
    TeamGameRecord {
        game_id: GameId(game),
        team_id: TeamId(team),
        season: season.to_string(),
        date,
        role,
        wins: won as u32,
        losses: !won as u32,
        home_wins: (home && won) as u32,
        home_losses: (home && !won) as u32,
        road_wins: (!home && won) as u32,
        road_losses: (!home && !won) as u32,
        offensive_efficiency: points as f64 / 100.0,
        scoring_margin: points as f64 - opponent_points as f64,
        fg_pct: 0.35 + points as f64 / 1000.0,
        points: Some(points),
    }
}

/// Both rows of one game, home first
pub fn game(
    id: u64,
    season: &str,
    date: NaiveDate,
    home: (i64, u32),
    away: (i64, u32),
) -> [TeamGameRecord; 2] {
    [
        side(id, home.0, season, date, Role::Home, home.1, away.1),
        side(id, away.0, season, date, Role::Away, away.1, home.1),
    ]
}

/// Every team plays once every other day; stronger teams and home teams
/// tend to win.
pub fn synthetic_league(seasons: &[(&str, NaiveDate)], game_days: u32, seed: u64) -> Vec<TeamGameRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut log = Vec::new();
    let mut next_id = 22_300_001u64;

    for (season, opener) in seasons {
        for day in 0..game_days {
            let date = *opener + Duration::days(2 * day as i64);
            let mut order: Vec<usize> = (0..TEAMS.len()).collect();
            order.shuffle(&mut rng);

            for pair in order.chunks(2) {
                let (home, away) = (pair[0], pair[1]);
                let edge = (away as i32 - home as i32) * 3 + 3;
                let mut margin = edge + rng.gen_range(-12..=12);
                if margin == 0 {
                    margin = 1;
                }
                let base: i32 = rng.gen_range(98..=112);
                let (home_pts, away_pts) = if margin > 0 {
                    (base + margin, base)
                } else {
                    (base, base - margin)
                };
                log.extend(game(
                    next_id,
                    season,
                    date,
                    (TEAMS[home], home_pts as u32),
                    (TEAMS[away], away_pts as u32),
                ));
                next_id += 1;
            }
        }
    }
    log
}

/// Two seasons of eighty game days each
pub fn two_season_league() -> Vec<TeamGameRecord> {
    synthetic_league(
        &[("2023-24", date(2023, 10, 24)), ("2024-25", date(2024, 10, 22))],
        80,
        7,
    )
}

/// Write records as a game log CSV
pub fn write_csv(records: &[TeamGameRecord], sink: impl Write) {
    let mut writer = csv::Writer::from_writer(sink);
    writer
        .write_record([
            "SEASON", "TEAM_ID", "GAME_ID", "GAME_DATE", "IS_OPPONENT", "W", "L", "W_HOME",
            "L_HOME", "W_ROAD", "L_ROAD", "OFFENSIVE_EFFICIENCY", "SCORING_MARGIN", "FG_PCT",
            "PTS",
        ])
        .unwrap();
    for r in records {
        writer
            .write_record([
                r.season.clone(),
                r.team_id.0.to_string(),
                r.game_id.to_string(),
                r.date.format("%Y-%m-%d").to_string(),
                ((r.role == Role::Away) as u8).to_string(),
                r.wins.to_string(),
                r.losses.to_string(),
                r.home_wins.to_string(),
                r.home_losses.to_string(),
                r.road_wins.to_string(),
                r.road_losses.to_string(),
                r.offensive_efficiency.to_string(),
                r.scoring_margin.to_string(),
                r.fg_pct.to_string(),
                r.points.map(|p| p.to_string()).unwrap_or_default(),
            ])
            .unwrap();
    }
    writer.flush().unwrap();
}
