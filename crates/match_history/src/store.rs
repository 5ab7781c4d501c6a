//! CSV-backed history ledger.
//!
//! A missing file is the first-run state, not an error. Writes go to a temp
//! file in the same directory and are swapped in with a rename, so an
//! interrupted write leaves the previous file intact.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

use crate::entry::HistoryEntry;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] io::Error),

    #[error("history csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("history swap failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub merged:   usize, // rows offered
    pub replaced: usize, // rows dropped by last-write-wins
    pub total:    usize, // rows now on disk
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All persisted rows, or empty when no history exists yet.
    pub fn load(&self) -> Result<Vec<HistoryEntry>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no history yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(file);
        // deserialize() swallows a failed header read and yields nothing
        rdr.headers()?;
        let rows = rdr.deserialize().collect::<std::result::Result<Vec<HistoryEntry>, _>>()?;
        Ok(rows)
    }

    pub fn match_ids_known(&self) -> Result<HashSet<String>> {
        Ok(self.load()?.into_iter().map(|e| e.match_id).collect())
    }

    /// Folds `new_entries` into the ledger. On a `(matchId, playerId)`
    /// collision the newer row replaces the older one.
    pub fn merge(&self, new_entries: &[HistoryEntry]) -> Result<MergeOutcome> {
        let existing = self.load()?;
        let offered = existing.len() + new_entries.len();

        let rows = merge_last_wins(existing, new_entries);
        self.write_atomic(&rows)?;

        let outcome = MergeOutcome {
            merged:   new_entries.len(),
            replaced: offered - rows.len(),
            total:    rows.len(),
        };
        info!(
            path = %self.path.display(),
            merged = outcome.merged,
            replaced = outcome.replaced,
            total = outcome.total,
            "history merged"
        );
        Ok(outcome)
    }

    fn write_atomic(&self, rows: &[HistoryEntry]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        {
            let mut w = csv::Writer::from_writer(tmp.as_file_mut());
            for row in rows {
                w.serialize(row)?;
            }
            w.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Concatenate and keep the last occurrence of each key, in the position of
/// that last occurrence.
fn merge_last_wins(existing: Vec<HistoryEntry>, new_entries: &[HistoryEntry]) -> Vec<HistoryEntry> {
    let mut all = existing;
    all.extend_from_slice(new_entries);

    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(all.len());
    let mut kept: Vec<HistoryEntry> = all
        .into_iter()
        .rev()
        .filter(|e| seen.insert((e.match_id.clone(), e.player_id.clone())))
        .collect();
    kept.reverse();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(match_id: &str, player_id: &str, goals: i64) -> HistoryEntry {
        HistoryEntry {
            match_id:          match_id.into(),
            timestamp:         "2025-10-01 20:00:00".into(),
            time_ago:          "3 hours ago".into(),
            club_id:           "3439844".into(),
            player_id:         player_id.into(),
            player_name:       format!("Player {player_id}"),
            position:          "midfielder".into(),
            rating:            7.3,
            goals,
            assists:           1,
            shots:             3,
            passes_completed:  20,
            pass_attempts:     24,
            tackles_completed: 2,
            tackle_attempts:   5,
            saves:             0,
            seconds_played:    5400,
            score:             410,
            red_cards:         0,
        }
    }

    #[test]
    fn absent_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("most_recent_matches.csv"));
        assert!(store.load().unwrap().is_empty());
        assert!(store.match_ids_known().unwrap().is_empty());
    }

    #[test]
    fn merge_creates_file_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("nested").join("history.csv"));

        let outcome = store.merge(&[row("m1", "p1", 2), row("m1", "p2", 0)]).unwrap();
        assert_eq!(outcome, MergeOutcome { merged: 2, replaced: 0, total: 2 });

        let raw = fs::read_to_string(store.path()).unwrap();
        let header = raw.lines().next().unwrap();
        assert_eq!(
            header,
            "matchId,timestamp,timeAgo,clubId,playerId,playerName,position,rating,goals,assists,\
             shots,passesCompleted,passAttempts,tacklesCompleted,tackleAttempts,saves,\
             secondsPlayed,score,redCards"
        );
        assert_eq!(store.load().unwrap(), vec![row("m1", "p1", 2), row("m1", "p2", 0)]);
    }

    #[test]
    fn collision_replaces_older_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));

        store.merge(&[row("m1", "p1", 1), row("m1", "p2", 0), row("m2", "p1", 5)]).unwrap();
        let outcome = store.merge(&[row("m1", "p1", 3), row("m3", "p9", 0)]).unwrap();
        assert_eq!(outcome, MergeOutcome { merged: 2, replaced: 1, total: 4 });

        assert_eq!(
            store.load().unwrap(),
            vec![row("m1", "p2", 0), row("m2", "p1", 5), row("m1", "p1", 3), row("m3", "p9", 0)]
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));
        store.merge(&[row("m0", "p1", 0)]).unwrap();

        let batch = [row("m1", "p1", 2), row("m1", "p2", 1), row("m0", "p1", 4)];
        store.merge(&batch).unwrap();
        let once = fs::read(store.path()).unwrap();
        store.merge(&batch).unwrap();
        let twice = fs::read(store.path()).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn known_ids_are_distinct_match_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));
        store.merge(&[row("m1", "p1", 0), row("m1", "p2", 0), row("m2", "p1", 0)]).unwrap();

        let known = store.match_ids_known().unwrap();
        assert_eq!(known.len(), 2);
        assert!(known.contains("m1") && known.contains("m2"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::write(&path, "matchId,playerId\nm1\n").unwrap();

        let store = HistoryStore::new(&path);
        assert!(matches!(store.load(), Err(HistoryError::Csv(_))));
        assert!(store.merge(&[row("m2", "p1", 0)]).is_err());
        // Original left untouched
        assert_eq!(fs::read_to_string(&path).unwrap(), "matchId,playerId\nm1\n");
    }

    #[test]
    fn directory_in_place_of_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        fs::create_dir(&path).unwrap();

        let store = HistoryStore::new(&path);
        assert!(store.load().is_err());
        assert!(store.match_ids_known().is_err());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.csv"));
        store.merge(&[row("m1", "p1", 0)]).unwrap();
        store.merge(&[row("m2", "p1", 0)]).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(names, ["history.csv"]);
    }
}
