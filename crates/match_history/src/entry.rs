use match_parser::{Match, PlayerStat};
use serde::{Deserialize, Serialize};

/// One history row. Identity is `(match_id, player_id)`; the rest is the
/// flattened stat line kept for exports. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub match_id:          String,
    pub timestamp:         String,
    pub time_ago:          String,
    pub club_id:           String,
    pub player_id:         String,
    pub player_name:       String,
    pub position:          String,
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
    pub red_cards:         i64,
}

impl HistoryEntry {
    pub fn from_player(m: &Match, p: &PlayerStat) -> Self {
        Self {
            match_id:          m.match_id.clone(),
            timestamp:         m.played_at(),
            time_ago:          m.time_ago.clone(),
            club_id:           p.club_id.clone(),
            player_id:         p.player_id.clone(),
            player_name:       p.player_name.clone(),
            position:          p.position.clone(),
            rating:            p.rating,
            goals:             p.goals,
            assists:           p.assists,
            shots:             p.shots,
            passes_completed:  p.passes_completed,
            pass_attempts:     p.pass_attempts,
            tackles_completed: p.tackles_completed,
            tackle_attempts:   p.tackle_attempts,
            saves:             p.saves,
            seconds_played:    p.seconds_played,
            score:             p.score,
            red_cards:         p.red_cards,
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.match_id, &self.player_id)
    }
}

/// Rows for every player of every match, in batch order.
pub fn entries_for_batch(matches: &[Match]) -> Vec<HistoryEntry> {
    matches
        .iter()
        .flat_map(|m| m.players().map(move |p| HistoryEntry::from_player(m, p)))
        .collect()
}
