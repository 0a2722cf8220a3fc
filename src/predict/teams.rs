//! Team name resolution
//!
//! Maps city names, nicknames, full names and common short forms to NBA
//! team ids. Matching is exact on the trimmed, lower-cased name.

use std::collections::HashMap;

use crate::TeamId;

/// (team id, full name, extra aliases)
const FRANCHISES: [(i64, &str, &[&str]); 30] = [
    (1610612737, "Atlanta Hawks", &["hawks", "atlanta"]),
    (1610612738, "Boston Celtics", &["celtics", "boston"]),
    (1610612751, "Brooklyn Nets", &["nets", "brooklyn"]),
    (1610612766, "Charlotte Hornets", &["hornets", "charlotte"]),
    (1610612741, "Chicago Bulls", &["bulls", "chicago"]),
    (1610612739, "Cleveland Cavaliers", &["cavaliers", "cleveland", "cavs"]),
    (1610612742, "Dallas Mavericks", &["mavericks", "dallas", "mavs"]),
    (1610612743, "Denver Nuggets", &["nuggets", "denver"]),
    (1610612765, "Detroit Pistons", &["pistons", "detroit"]),
    (1610612744, "Golden State Warriors", &["warriors", "golden state"]),
    (1610612745, "Houston Rockets", &["rockets", "houston"]),
    (1610612754, "Indiana Pacers", &["pacers", "indiana"]),
    (1610612746, "Los Angeles Clippers", &["clippers", "la clippers"]),
    (
        1610612747,
        "Los Angeles Lakers",
        &["lakers", "la lakers", "los angeles"],
    ),
    (1610612763, "Memphis Grizzlies", &["grizzlies", "memphis"]),
    (1610612748, "Miami Heat", &["heat", "miami"]),
    (1610612749, "Milwaukee Bucks", &["bucks", "milwaukee"]),
    (
        1610612750,
        "Minnesota Timberwolves",
        &["timberwolves", "minnesota", "wolves"],
    ),
    (1610612740, "New Orleans Pelicans", &["pelicans", "new orleans"]),
    (1610612752, "New York Knicks", &["knicks", "new york"]),
    (
        1610612760,
        "Oklahoma City Thunder",
        &["thunder", "oklahoma city", "okc"],
    ),
    (1610612753, "Orlando Magic", &["magic", "orlando"]),
    (1610612755, "Philadelphia 76ers", &["76ers", "philadelphia", "sixers"]),
    (1610612756, "Phoenix Suns", &["suns", "phoenix"]),
    (
        1610612757,
        "Portland Trail Blazers",
        &["trail blazers", "portland", "blazers"],
    ),
    (1610612758, "Sacramento Kings", &["kings", "sacramento"]),
    (1610612759, "San Antonio Spurs", &["spurs", "san antonio"]),
    (1610612761, "Toronto Raptors", &["raptors", "toronto"]),
    (1610612762, "Utah Jazz", &["jazz", "utah"]),
    (1610612764, "Washington Wizards", &["wizards", "washington"]),
];

fn normalise(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lookup from names to team ids
#[derive(Debug, Clone)]
pub struct TeamDirectory {
    by_name: HashMap<String, TeamId>,
    full_names: HashMap<TeamId, &'static str>,
}

impl Default for TeamDirectory {
    fn default() -> Self {
        Self::nba()
    }
}

impl TeamDirectory {
    /// Directory of the 30 current NBA franchises
    pub fn nba() -> Self {
        let mut by_name = HashMap::new();
        let mut full_names = HashMap::new();
        for (id, full_name, aliases) in FRANCHISES {
            let id = TeamId(id);
            by_name.insert(normalise(full_name), id);
            for alias in aliases {
                by_name.insert(normalise(alias), id);
            }
            full_names.insert(id, full_name);
        }
        TeamDirectory {
            by_name,
            full_names,
        }
    }

    /// Resolve a display name, `None` when unknown
    pub fn resolve(&self, name: &str) -> Option<TeamId> {
        self.by_name.get(&normalise(name)).copied()
    }

    /// Register an extra alias, replacing any previous mapping
    pub fn add_alias(&mut self, alias: &str, team: TeamId) {
        self.by_name.insert(normalise(alias), team);
    }

    /// Register several aliases at once
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = (S, TeamId)>,
        S: AsRef<str>,
    {
        for (alias, team) in aliases {
            self.add_alias(alias.as_ref(), team);
        }
        self
    }

    /// Canonical full name of a franchise
    pub fn full_name(&self, team: TeamId) -> Option<&'static str> {
        self.full_names.get(&team).copied()
    }

    /// All franchises ordered by full name
    pub fn teams(&self) -> Vec<(TeamId, &'static str)> {
        let mut teams: Vec<_> = self.full_names.iter().map(|(id, n)| (*id, *n)).collect();
        teams.sort_by_key(|(_, name)| *name);
        teams
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_names_and_aliases() {
        let teams = TeamDirectory::nba();
        let celtics = Some(TeamId(1610612738));
        assert_eq!(teams.resolve("Celtics"), celtics);
        assert_eq!(teams.resolve("  boston "), celtics);
        assert_eq!(teams.resolve("BOSTON CELTICS"), celtics);
        assert_eq!(teams.resolve("okc"), Some(TeamId(1610612760)));
        assert_eq!(teams.resolve("Los Angeles"), Some(TeamId(1610612747)));
    }

    #[test]
    fn test_unknown_name() {
        let teams = TeamDirectory::nba();
        assert_eq!(teams.resolve("Seattle SuperSonics"), None);
        assert_eq!(teams.resolve(""), None);
    }

    #[test]
    fn test_extra_aliases() {
        let teams = TeamDirectory::nba().with_aliases([("Sonics", TeamId(1610612760))]);
        assert_eq!(teams.resolve("sonics"), Some(TeamId(1610612760)));
    }

    #[test]
    fn test_thirty_franchises() {
        let teams = TeamDirectory::nba();
        assert_eq!(teams.teams().len(), 30);
        assert_eq!(teams.full_name(TeamId(1610612744)), Some("Golden State Warriors"));
    }
}
