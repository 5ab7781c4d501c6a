//! Raw match record → `Match`.
//!
//! A raw record looks like
//! `{"matchId": "...", "timestamp": 1759341600, "timeAgo": {...}, "players": {...}}`
//! where `players` is `clubId → playerId → statMap`, delivered either as a JSON
//! object or as a data-literal string. Every failure here is per record: the
//! caller skips the record and carries on with the batch.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::literal::{parse_literal, LiteralError};
use crate::model::{ClubRoster, Match, PlayerStat, StatKind};

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("malformed players literal: {0}")]
    Literal(#[from] LiteralError),

    #[error("`{path}` is not a mapping")]
    NotAMapping { path: String },

    #[error("field `{field}` is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },

    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(i64),

    #[error("record has no players")]
    NoPlayers,
}

pub type Result<T> = std::result::Result<T, RecordError>;

// ── Field table ──────────────────────────────────────────────────────────────

/// Text columns: upstream key, default, setter.
const TEXT_FIELDS: [(&str, &str, fn(&mut PlayerStat, String)); 3] = [
    ("playername",  "Unknown", |p, v| p.player_name = v),
    ("pos",         "Unknown", |p, v| p.position = v),
    ("archetypeid", "0",       |p, v| p.archetype_id = v),
];

const RATING_KEY: &str = "rating";

/// Best-effort match id of a raw record, for log lines about skipped records.
pub fn record_match_id(raw: &Value) -> Option<String> {
    raw.get("matchId").and_then(scalar_text)
}

pub fn normalize_record(raw: &Value, offset: FixedOffset) -> Result<Match> {
    let record = raw.as_object().ok_or(RecordError::NotAnObject)?;

    let match_id = present(record, "matchId")
        .and_then(scalar_text)
        .filter(|id| !id.is_empty())
        .ok_or(RecordError::MissingField("matchId"))?;

    let secs = present(record, "timestamp")
        .ok_or(RecordError::MissingField("timestamp"))
        .and_then(|v| coerce_int("timestamp", v))?;
    let timestamp = DateTime::from_timestamp(secs, 0)
        .ok_or(RecordError::TimestampOutOfRange(secs))?
        .with_timezone(&offset);

    let time_ago = present(record, "timeAgo").map(render_time_ago).unwrap_or_default();

    let players = match present(record, "players") {
        None => return Err(RecordError::MissingField("players")),
        Some(Value::String(text)) => parse_literal(text)?,
        Some(v) => v.clone(),
    };
    let clubs = players
        .as_object()
        .ok_or_else(|| RecordError::NotAMapping { path: "players".into() })?;

    let mut players_by_club = Vec::with_capacity(clubs.len());
    for (club_id, club_players) in clubs {
        let club_players = club_players
            .as_object()
            .ok_or_else(|| RecordError::NotAMapping { path: format!("players.{club_id}") })?;

        let mut roster = Vec::with_capacity(club_players.len());
        for (player_id, stats) in club_players {
            let stats = stats.as_object().ok_or_else(|| RecordError::NotAMapping {
                path: format!("players.{club_id}.{player_id}"),
            })?;
            roster.push(extract_player(player_id, club_id, stats)?);
        }

        players_by_club.push(ClubRoster { club_id: club_id.clone(), players: roster });
    }

    // Nothing to record, so the id would never reach the history
    if players_by_club.iter().all(|c| c.players.is_empty()) {
        return Err(RecordError::NoPlayers);
    }

    debug!(match_id = %match_id, clubs = players_by_club.len(), "record normalized");

    Ok(Match { match_id, timestamp, time_ago, players_by_club })
}

fn extract_player(player_id: &str, club_id: &str, stats: &Map<String, Value>) -> Result<PlayerStat> {
    let mut p = PlayerStat::new(player_id, club_id);

    for (key, default, set) in TEXT_FIELDS {
        let text = present(stats, key).and_then(scalar_text).unwrap_or_else(|| default.to_string());
        set(&mut p, text);
    }

    if let Some(v) = present(stats, RATING_KEY) {
        p.rating = coerce_float(RATING_KEY, v)?;
    }

    for kind in StatKind::ALL {
        if let Some(v) = present(stats, kind.upstream_key()) {
            kind.set(&mut p, coerce_int(kind.upstream_key(), v)?);
        }
    }

    Ok(p)
}

// ── Coercion ─────────────────────────────────────────────────────────────────

/// `null` counts as absent.
fn present<'v>(map: &'v Map<String, Value>, key: &str) -> Option<&'v Value> {
    map.get(key).filter(|v| !v.is_null())
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn not_numeric(field: &'static str, v: &Value) -> RecordError {
    RecordError::NotNumeric { field, value: v.to_string() }
}

/// Integers from numbers or numeric strings; finite floats truncate toward zero.
fn coerce_int(field: &'static str, v: &Value) -> Result<i64> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                _ => Err(not_numeric(field, v)),
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_numeric(field, v)),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(not_numeric(field, v)),
    }
}

fn coerce_float(field: &'static str, v: &Value) -> Result<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    f.filter(|f| f.is_finite()).ok_or_else(|| not_numeric(field, v))
}

/// `"2 hours ago"` passes through; `{"number": 2, "unit": "hours"}` is rendered.
fn render_time_ago(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Object(o) => {
            let number = o.get("number").and_then(scalar_text);
            let unit = o.get("unit").and_then(scalar_text);
            match (number, unit) {
                (Some(n), Some(u)) => format!("{n} {u} ago"),
                _ => v.to_string(),
            }
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cet() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn structured() -> Value {
        json!({
            "matchId": "171001",
            "timestamp": 1759341600,
            "timeAgo": { "number": 3, "unit": "hours" },
            "players": {
                "3439844": {
                    "1001": {
                        "playername": "Alice", "pos": "forward", "archetypeid": "12",
                        "rating": "8.40", "goals": "2", "assists": "1", "shots": "5",
                        "passesmade": "14", "passattempts": "17", "tacklesmade": "1",
                        "tackleattempts": "3", "saves": "0", "secondsPlayed": "5400",
                        "SCORE": "512", "wins": "1", "losses": "0", "redcards": "0",
                        "userResult": "1"
                    },
                    "1002": { "playername": "Bob", "goals": "0" }
                },
                "778899": {
                    "2001": { "playername": "Carol", "pos": "goalkeeper", "saves": "6" }
                }
            }
        })
    }

    const LITERAL_PLAYERS: &str = "{'3439844': {'1001': {'playername': 'Alice', 'pos': 'forward', \
        'archetypeid': '12', 'rating': '8.40', 'goals': '2', 'assists': '1', 'shots': '5', \
        'passesmade': '14', 'passattempts': '17', 'tacklesmade': '1', 'tackleattempts': '3', \
        'saves': '0', 'secondsPlayed': '5400', 'SCORE': '512', 'wins': '1', 'losses': '0', \
        'redcards': '0', 'userResult': '1'}, '1002': {'playername': 'Bob', 'goals': '0'}}, \
        '778899': {'2001': {'playername': 'Carol', 'pos': 'goalkeeper', 'saves': '6'}}}";

    #[test]
    fn normalizes_structured_record() {
        let m = normalize_record(&structured(), cet()).unwrap();

        assert_eq!(m.match_id, "171001");
        assert_eq!(m.time_ago, "3 hours ago");
        assert_eq!(m.played_at(), "2025-10-01 20:00:00");
        assert_eq!(m.club_ids(), ["3439844", "778899"]);

        let alice = &m.players_for_club("3439844")[0];
        assert_eq!(alice.player_id, "1001");
        assert_eq!(alice.player_name, "Alice");
        assert_eq!(alice.club_id, "3439844");
        assert_eq!(alice.rating, 8.4);
        assert_eq!(alice.goals, 2);
        assert_eq!(alice.passes_completed, 14);
        assert_eq!(alice.pass_attempts, 17);
        assert_eq!(alice.tackles_completed, 1);
        assert_eq!(alice.seconds_played, 5400);
        assert_eq!(alice.score, 512);
        assert_eq!(alice.user_result, 1);
    }

    #[test]
    fn literal_and_structured_players_are_equivalent() {
        let mut literal = structured();
        literal["players"] = Value::String(LITERAL_PLAYERS.to_string());

        assert_eq!(
            normalize_record(&literal, cet()).unwrap(),
            normalize_record(&structured(), cet()).unwrap()
        );
    }

    #[test]
    fn absent_fields_take_defaults() {
        let m = normalize_record(&structured(), cet()).unwrap();
        let bob = &m.players_for_club("3439844")[1];
        assert_eq!(bob.position, "Unknown");
        assert_eq!(bob.archetype_id, "0");
        assert_eq!(bob.rating, 0.0);
        assert_eq!(bob.assists, 0);

        let raw = json!({
            "matchId": 99, "timestamp": "1759341600",
            "players": { "1": { "7": { "playername": null, "goals": null } } }
        });
        let m = normalize_record(&raw, cet()).unwrap();
        assert_eq!(m.match_id, "99");
        assert_eq!(m.time_ago, "");
        let p = &m.players_for_club("1")[0];
        assert_eq!(p.player_name, "Unknown");
        assert_eq!(p.goals, 0);
    }

    #[test]
    fn inconsistent_counts_pass_through() {
        let raw = json!({
            "matchId": "1", "timestamp": 0,
            "players": { "1": { "7": { "passesmade": 9, "passattempts": 3, "goals": 2.9 } } }
        });
        let p = normalize_record(&raw, cet()).unwrap().players_for_club("1")[0].clone();
        assert_eq!(p.passes_completed, 9);
        assert_eq!(p.pass_attempts, 3);
        assert_eq!(p.goals, 2);
    }

    #[test]
    fn club_and_player_order_follow_upstream() {
        let raw = json!({
            "matchId": "1", "timestamp": 0,
            "players": "{'z': {'9': {}, '1': {}}, 'a': {'5': {}}}"
        });
        let m = normalize_record(&raw, cet()).unwrap();
        assert_eq!(m.club_ids(), ["z", "a"]);
        let ids: Vec<&str> = m.players().map(|p| p.player_id.as_str()).collect();
        assert_eq!(ids, ["9", "1", "5"]);
    }

    #[test]
    fn per_record_failures() {
        let mut raw = structured();
        raw.as_object_mut().unwrap().remove("players");
        assert_eq!(normalize_record(&raw, cet()), Err(RecordError::MissingField("players")));

        let mut raw = structured();
        raw["players"] = json!("{'3439844': {'1001': ");
        assert!(matches!(normalize_record(&raw, cet()), Err(RecordError::Literal(_))));

        let mut raw = structured();
        raw["players"]["3439844"]["1001"]["goals"] = json!("two");
        assert_eq!(
            normalize_record(&raw, cet()),
            Err(RecordError::NotNumeric { field: "goals", value: "\"two\"".into() })
        );

        let mut raw = structured();
        raw["players"]["778899"] = json!(["not", "a", "map"]);
        assert!(matches!(normalize_record(&raw, cet()), Err(RecordError::NotAMapping { .. })));

        let mut raw = structured();
        raw["players"] = json!({});
        assert_eq!(normalize_record(&raw, cet()), Err(RecordError::NoPlayers));
        raw["players"] = json!("{'3439844': {}, '778899': {}}");
        assert_eq!(normalize_record(&raw, cet()), Err(RecordError::NoPlayers));

        let mut raw = structured();
        raw.as_object_mut().unwrap().remove("matchId");
        assert_eq!(normalize_record(&raw, cet()), Err(RecordError::MissingField("matchId")));
        assert_eq!(normalize_record(&json!([1, 2]), cet()), Err(RecordError::NotAnObject));
    }
}
