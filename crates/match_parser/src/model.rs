use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// One player's line for one club in one match.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStat {
    pub player_id:         String,
    pub player_name:       String,
    pub club_id:           String,
    pub position:          String,
    pub archetype_id:      String,
    pub rating:            f64,
    pub goals:             i64,
    pub assists:           i64,
    pub shots:             i64,
    pub passes_completed:  i64,
    pub pass_attempts:     i64,
    pub tackles_completed: i64,
    pub tackle_attempts:   i64,
    pub saves:             i64,
    pub seconds_played:    i64,
    pub score:             i64,
    pub wins:              i64,
    pub losses:            i64,
    pub red_cards:         i64,
    pub user_result:       i64,
}

impl PlayerStat {
    /// Fresh row with every field at its upstream default.
    pub fn new(player_id: impl Into<String>, club_id: impl Into<String>) -> Self {
        Self {
            player_id:         player_id.into(),
            player_name:       "Unknown".to_string(),
            club_id:           club_id.into(),
            position:          "Unknown".to_string(),
            archetype_id:      "0".to_string(),
            rating:            0.0,
            goals:             0,
            assists:           0,
            shots:             0,
            passes_completed:  0,
            pass_attempts:     0,
            tackles_completed: 0,
            tackle_attempts:   0,
            saves:             0,
            seconds_played:    0,
            score:             0,
            wins:              0,
            losses:            0,
            red_cards:         0,
            user_result:       0,
        }
    }
}

/// Integer stat columns. `ALL` doubles as the extraction table for the
/// normalizer: every entry maps one upstream key onto one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Goals,
    Assists,
    Shots,
    PassesCompleted,
    PassAttempts,
    TacklesCompleted,
    TackleAttempts,
    Saves,
    SecondsPlayed,
    Score,
    Wins,
    Losses,
    RedCards,
    UserResult,
}

impl StatKind {
    pub const ALL: [StatKind; 14] = [
        StatKind::Goals,
        StatKind::Assists,
        StatKind::Shots,
        StatKind::PassesCompleted,
        StatKind::PassAttempts,
        StatKind::TacklesCompleted,
        StatKind::TackleAttempts,
        StatKind::Saves,
        StatKind::SecondsPlayed,
        StatKind::Score,
        StatKind::Wins,
        StatKind::Losses,
        StatKind::RedCards,
        StatKind::UserResult,
    ];

    /// Key inside the raw per-player stat map.
    pub fn upstream_key(self) -> &'static str {
        match self {
            StatKind::Goals            => "goals",
            StatKind::Assists          => "assists",
            StatKind::Shots            => "shots",
            StatKind::PassesCompleted  => "passesmade",
            StatKind::PassAttempts     => "passattempts",
            StatKind::TacklesCompleted => "tacklesmade",
            StatKind::TackleAttempts   => "tackleattempts",
            StatKind::Saves            => "saves",
            StatKind::SecondsPlayed    => "secondsPlayed",
            StatKind::Score            => "SCORE",
            StatKind::Wins             => "wins",
            StatKind::Losses           => "losses",
            StatKind::RedCards         => "redcards",
            StatKind::UserResult       => "userResult",
        }
    }

    /// Our own identifier, also the history/export column name.
    pub fn ident(self) -> &'static str {
        match self {
            StatKind::Goals            => "goals",
            StatKind::Assists          => "assists",
            StatKind::Shots            => "shots",
            StatKind::PassesCompleted  => "passesCompleted",
            StatKind::PassAttempts     => "passAttempts",
            StatKind::TacklesCompleted => "tacklesCompleted",
            StatKind::TackleAttempts   => "tackleAttempts",
            StatKind::Saves            => "saves",
            StatKind::SecondsPlayed    => "secondsPlayed",
            StatKind::Score            => "score",
            StatKind::Wins             => "wins",
            StatKind::Losses           => "losses",
            StatKind::RedCards         => "redCards",
            StatKind::UserResult       => "userResult",
        }
    }

    pub fn get(self, p: &PlayerStat) -> i64 {
        match self {
            StatKind::Goals            => p.goals,
            StatKind::Assists          => p.assists,
            StatKind::Shots            => p.shots,
            StatKind::PassesCompleted  => p.passes_completed,
            StatKind::PassAttempts     => p.pass_attempts,
            StatKind::TacklesCompleted => p.tackles_completed,
            StatKind::TackleAttempts   => p.tackle_attempts,
            StatKind::Saves            => p.saves,
            StatKind::SecondsPlayed    => p.seconds_played,
            StatKind::Score            => p.score,
            StatKind::Wins             => p.wins,
            StatKind::Losses           => p.losses,
            StatKind::RedCards         => p.red_cards,
            StatKind::UserResult       => p.user_result,
        }
    }

    pub fn set(self, p: &mut PlayerStat, value: i64) {
        let slot = match self {
            StatKind::Goals            => &mut p.goals,
            StatKind::Assists          => &mut p.assists,
            StatKind::Shots            => &mut p.shots,
            StatKind::PassesCompleted  => &mut p.passes_completed,
            StatKind::PassAttempts     => &mut p.pass_attempts,
            StatKind::TacklesCompleted => &mut p.tackles_completed,
            StatKind::TackleAttempts   => &mut p.tackle_attempts,
            StatKind::Saves            => &mut p.saves,
            StatKind::SecondsPlayed    => &mut p.seconds_played,
            StatKind::Score            => &mut p.score,
            StatKind::Wins             => &mut p.wins,
            StatKind::Losses           => &mut p.losses,
            StatKind::RedCards         => &mut p.red_cards,
            StatKind::UserResult       => &mut p.user_result,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubRoster {
    pub club_id: String,
    pub players: Vec<PlayerStat>,
}

/// One completed match. Clubs and players keep upstream order.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub match_id:        String,
    pub timestamp:       DateTime<FixedOffset>,
    pub time_ago:        String,
    pub players_by_club: Vec<ClubRoster>,
}

impl Match {
    pub fn players_for_club(&self, club_id: &str) -> &[PlayerStat] {
        self.players_by_club
            .iter()
            .find(|c| c.club_id == club_id)
            .map(|c| c.players.as_slice())
            .unwrap_or(&[])
    }

    pub fn club_ids(&self) -> Vec<String> {
        self.players_by_club.iter().map(|c| c.club_id.clone()).collect()
    }

    pub fn player_count(&self) -> usize {
        self.players_by_club.iter().map(|c| c.players.len()).sum()
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerStat> {
        self.players_by_club.iter().flat_map(|c| c.players.iter())
    }

    /// Timestamp as shown in history and exports (already offset-adjusted).
    pub fn played_at(&self) -> String {
        self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_table_round_trips_every_field() {
        let mut p = PlayerStat::new("1", "c");
        for (i, kind) in StatKind::ALL.iter().enumerate() {
            kind.set(&mut p, i as i64 + 1);
        }
        for (i, kind) in StatKind::ALL.iter().enumerate() {
            assert_eq!(kind.get(&p), i as i64 + 1, "{}", kind.ident());
        }
        assert_eq!(p.red_cards, 13);
        assert_eq!(p.passes_completed, 4);
    }

    #[test]
    fn missing_club_has_no_players() {
        let m = Match {
            match_id:        "m".into(),
            timestamp:       DateTime::parse_from_rfc3339("2025-10-01T20:00:00+02:00").unwrap(),
            time_ago:        String::new(),
            players_by_club: vec![ClubRoster { club_id: "a".into(), players: vec![PlayerStat::new("1", "a")] }],
        };
        assert_eq!(m.players_for_club("a").len(), 1);
        assert!(m.players_for_club("zzz").is_empty());
        assert_eq!(m.played_at(), "2025-10-01 20:00:00");
    }
}
