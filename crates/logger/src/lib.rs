/// ProClubs Tracker: Logger
/// JSONL audit event stream, one file per UTC day

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:           String,
    pub event:        &'static str,   // "API_STATUS"
    pub source:       String,
    pub scope:        String,         // club id
    pub ok:           bool,
    pub message:      String,
    pub items:        usize,
}

#[derive(Serialize, Debug)]
pub struct RecordSkippedEvent {
    pub ts:           String,
    pub event:        &'static str,   // "RECORD_SKIPPED"
    pub index:        usize,
    pub match_id:     Option<String>,
    pub reason:       String,
}

#[derive(Serialize, Debug)]
pub struct MatchDetectedEvent {
    pub ts:           String,
    pub event:        &'static str,   // "MATCH_DETECTED"
    pub match_id:     String,
    pub played_at:    String,
    pub clubs:        Vec<String>,
    pub players:      usize,
}

#[derive(Serialize, Debug)]
pub struct HistoryCommitEvent {
    pub ts:           String,
    pub event:        &'static str,   // "HISTORY_COMMIT"
    pub path:         String,
    pub ok:           bool,
    pub rows_merged:  usize,
    pub rows_total:   usize,
    pub message:      String,
}

#[derive(Serialize, Debug)]
pub struct FactDeliveryEvent {
    pub ts:           String,
    pub event:        &'static str,   // "FACT_DELIVERY"
    pub match_id:     String,
    pub seq:          usize,          // 1-based pozice ve dávce
    pub payload:      String,
    pub ok:           bool,
    pub message:      String,
}

#[derive(Serialize, Debug)]
pub struct CycleHeartbeatEvent {
    pub ts:           String,
    pub event:        &'static str,   // "CYCLE_HEARTBEAT"
    pub outcome:      String,
    pub fetched:      usize,
    pub normalized:   usize,
    pub skipped:      usize,
    pub new_matches:  usize,
    pub facts_sent:   usize,
    pub facts_failed: usize,
    pub committed:    bool,
}
