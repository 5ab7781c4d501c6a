//! Fact strings for the sheet: `"<playerName> <Stat Label> <value>"`.

use serde::Serialize;
use std::fmt;

use crate::model::{Match, StatKind};

/// Stats forwarded to the sheet, in output order. Extend here only.
pub const TRACKED_STATS: [StatKind; 5] = [
    StatKind::Goals,
    StatKind::Assists,
    StatKind::PassesCompleted,
    StatKind::TacklesCompleted,
    StatKind::RedCards,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FactPayload(String);

impl FactPayload {
    pub fn new(player_name: &str, stat: StatKind, value: i64) -> Self {
        Self(format!("{} {} {}", player_name, title_case(stat.ident()), value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FactPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One fact per (player, stat) of `club_id`, player-major. Empty if the club
/// did not play in `m`.
pub fn extract_facts(m: &Match, club_id: &str, stats: &[StatKind]) -> Vec<FactPayload> {
    m.players_for_club(club_id)
        .iter()
        .flat_map(|p| stats.iter().map(move |&s| FactPayload::new(&p.player_name, s, s.get(p))))
        .collect()
}

/// `passesCompleted` → `Passes Completed`, `red_cards` → `Red Cards`.
pub fn title_case(ident: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in ident.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClubRoster, PlayerStat};
    use chrono::DateTime;

    fn player(id: &str, name: &str, goals: i64, assists: i64) -> PlayerStat {
        let mut p = PlayerStat::new(id, "3439844");
        p.player_name = name.to_string();
        p.goals = goals;
        p.assists = assists;
        p
    }

    fn one_match(players: Vec<PlayerStat>) -> Match {
        Match {
            match_id:        "171001".into(),
            timestamp:       DateTime::parse_from_rfc3339("2025-10-01T20:00:00+02:00").unwrap(),
            time_ago:        "1 hours ago".into(),
            players_by_club: vec![
                ClubRoster { club_id: "3439844".into(), players },
                ClubRoster { club_id: "778899".into(), players: vec![player("9", "Opponent", 4, 4)] },
            ],
        }
    }

    #[test]
    fn facts_for_tracked_stats_in_order() {
        let m = one_match(vec![player("1", "Alice", 2, 1)]);
        let facts: Vec<String> = extract_facts(&m, "3439844", &[StatKind::Goals, StatKind::Assists])
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(facts, ["Alice Goals 2", "Alice Assists 1"]);
    }

    #[test]
    fn player_major_order_with_default_stats() {
        let mut bob = player("2", "Bob", 0, 3);
        bob.passes_completed = 20;
        bob.tackles_completed = 4;
        bob.red_cards = 1;
        let m = one_match(vec![player("1", "Alice", 2, 1), bob]);

        let facts = extract_facts(&m, "3439844", &TRACKED_STATS);
        assert_eq!(facts.len(), 10);
        assert_eq!(facts[0].as_str(), "Alice Goals 2");
        assert_eq!(facts[4].as_str(), "Alice Red Cards 0");
        assert_eq!(facts[5].as_str(), "Bob Goals 0");
        assert_eq!(facts[7].as_str(), "Bob Passes Completed 20");
        assert_eq!(facts[8].as_str(), "Bob Tackles Completed 4");
        assert_eq!(facts[9].as_str(), "Bob Red Cards 1");
    }

    #[test]
    fn other_club_is_not_reported() {
        let m = one_match(vec![]);
        assert!(extract_facts(&m, "3439844", &TRACKED_STATS).is_empty());
        assert!(extract_facts(&m, "nope", &TRACKED_STATS).is_empty());
        assert_eq!(extract_facts(&m, "778899", &[StatKind::Goals])[0].as_str(), "Opponent Goals 4");
    }

    #[test]
    fn title_case_identifiers() {
        assert_eq!(title_case("passesCompleted"), "Passes Completed");
        assert_eq!(title_case("redCards"), "Red Cards");
        assert_eq!(title_case("goals"), "Goals");
        assert_eq!(title_case("tackle_attempts"), "Tackle Attempts");
        assert_eq!(title_case("SCORE"), "Score");
        assert_eq!(title_case(""), "");
    }
}
