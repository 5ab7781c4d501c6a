//! Audit exports of fetched matches: `club_matches.{csv,json}` for the whole
//! batch and `newest_match.json` for the match whose facts were sent.

use anyhow::{Context, Result};
use match_history::entries_for_batch;
use match_parser::Match;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv"  => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other  => Err(format!("unsupported export format {other:?} (use csv or json)")),
        }
    }
}

#[derive(Serialize)]
struct MatchExport<'a> {
    match_id:  &'a str,
    timestamp: String,
    time_ago:  &'a str,
    clubs:     Map<String, Value>,
}

impl<'a> MatchExport<'a> {
    fn from_match(m: &'a Match) -> Result<Self> {
        let mut clubs = Map::new();
        for roster in &m.players_by_club {
            clubs.insert(roster.club_id.clone(), serde_json::to_value(&roster.players)?);
        }
        Ok(Self {
            match_id:  &m.match_id,
            timestamp: m.played_at(),
            time_ago:  &m.time_ago,
            clubs,
        })
    }
}

pub struct Exporter {
    dir:    PathBuf,
    format: ExportFormat,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self { dir: dir.into(), format }
    }

    /// Whole batch, one row per player (CSV) or nested per club (JSON).
    pub fn export_batch(&self, matches: &[Match]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create export dir {}", self.dir.display()))?;

        match self.format {
            ExportFormat::Csv => {
                let path = self.dir.join("club_matches.csv");
                let mut w = csv::Writer::from_path(&path)
                    .with_context(|| format!("open {}", path.display()))?;
                for row in entries_for_batch(matches) {
                    w.serialize(row)?;
                }
                w.flush()?;
                Ok(path)
            }
            ExportFormat::Json => {
                let path = self.dir.join("club_matches.json");
                let docs = matches.iter().map(MatchExport::from_match).collect::<Result<Vec<_>>>()?;
                write_json(&path, &docs)?;
                Ok(path)
            }
        }
    }

    /// Single match, wrapped in a one-element list like the batch JSON.
    pub fn export_newest(&self, m: &Match) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create export dir {}", self.dir.display()))?;
        let path = self.dir.join("newest_match.json");
        write_json(&path, &[MatchExport::from_match(m)?])?;
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use match_parser::{ClubRoster, PlayerStat};

    fn sample() -> Match {
        let mut alice = PlayerStat::new("1001", "3439844");
        alice.player_name = "Alice".into();
        alice.goals = 2;
        Match {
            match_id:        "171001".into(),
            timestamp:       DateTime::parse_from_rfc3339("2025-10-01T20:00:00+02:00").unwrap(),
            time_ago:        "3 hours ago".into(),
            players_by_club: vec![
                ClubRoster { club_id: "3439844".into(), players: vec![alice] },
                ClubRoster { club_id: "778899".into(), players: vec![PlayerStat::new("2001", "778899")] },
            ],
        }
    }

    #[test]
    fn csv_batch_has_history_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = Exporter::new(dir.path(), ExportFormat::Csv).export_batch(&[sample()]).unwrap();

        let raw = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("matchId,timestamp,timeAgo,clubId,playerId,playerName"));
        assert!(lines[1].starts_with("171001,2025-10-01 20:00:00,3 hours ago,3439844,1001,Alice"));
    }

    #[test]
    fn json_exports_nest_players_by_club() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = Exporter::new(dir.path().join("out"), ExportFormat::Json);

        let batch: Value = serde_json::from_str(
            &fs::read_to_string(exporter.export_batch(&[sample(), sample()]).unwrap()).unwrap(),
        ).unwrap();
        assert_eq!(batch.as_array().unwrap().len(), 2);

        let newest: Value = serde_json::from_str(
            &fs::read_to_string(exporter.export_newest(&sample()).unwrap()).unwrap(),
        ).unwrap();
        assert_eq!(newest[0]["match_id"], "171001");
        assert_eq!(newest[0]["clubs"]["3439844"][0]["playerName"], "Alice");
        assert_eq!(newest[0]["clubs"]["3439844"][0]["goals"], 2);
        assert_eq!(newest[0]["clubs"]["778899"][0]["playerName"], "Unknown");
    }

    #[test]
    fn export_format_names() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }
}
