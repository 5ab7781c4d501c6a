//! Dispatch cycle: fetch → normalize → detect → extract → commit → deliver.
//!
//! Cycles run strictly one after another. Per-cycle state (the batch, the
//! change set, the facts) lives only inside `run_cycle`; the history file is
//! the only thing carried between cycles.

use anyhow::Result;
use async_trait::async_trait;
use chrono::FixedOffset;
use logger::{
    now_iso, ApiStatusEvent, CycleHeartbeatEvent, EventLogger, FactDeliveryEvent,
    HistoryCommitEvent, MatchDetectedEvent, RecordSkippedEvent,
};
use match_history::{detect_new_matches, entries_for_batch, HistoryStore};
use match_parser::{
    extract_facts, normalize_record, record_match_id, FactPayload, Match, StatKind, TRACKED_STATS,
};
use proclubs_api::{MatchType, ProClubsClient};
use serde_json::Value;
use sheets_sink::SheetsSink;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::export::Exporter;

// ── Collaborators ────────────────────────────────────────────────────────────

#[async_trait]
pub trait MatchSource: Send + Sync {
    async fn fetch_matches(&self, club_id: &str, match_type: MatchType, limit: u32) -> Result<Vec<Value>>;
}

#[async_trait]
pub trait FactSink: Send + Sync {
    /// Returns the sink's reply text on success.
    async fn deliver(&self, fact: &FactPayload) -> Result<String>;
}

#[async_trait]
impl MatchSource for ProClubsClient {
    async fn fetch_matches(&self, club_id: &str, match_type: MatchType, limit: u32) -> Result<Vec<Value>> {
        Ok(ProClubsClient::fetch_matches(self, club_id, match_type, limit).await?)
    }
}

#[async_trait]
impl FactSink for SheetsSink {
    async fn deliver(&self, fact: &FactPayload) -> Result<String> {
        Ok(self.send(fact.as_str()).await?)
    }
}

// ── Cycle state ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub club_id:       String,
    pub match_type:    MatchType,
    pub max_results:   u32,
    pub utc_offset:    FixedOffset,
    pub tracked_stats: Vec<StatKind>,
}

impl From<&Config> for CycleSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            club_id:       cfg.club_id.clone(),
            match_type:    cfg.match_type,
            max_results:   cfg.max_results,
            utc_offset:    cfg.utc_offset,
            tracked_stats: TRACKED_STATS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleOutcome {
    #[default]
    FetchFailed,
    NoMatches,
    HistoryUnavailable,
    NoNewMatches,
    Dispatched,
}

impl CycleOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleOutcome::FetchFailed        => "fetch_failed",
            CycleOutcome::NoMatches          => "no_matches",
            CycleOutcome::HistoryUnavailable => "history_unavailable",
            CycleOutcome::NoNewMatches       => "no_new_matches",
            CycleOutcome::Dispatched         => "dispatched",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub outcome:      CycleOutcome,
    pub fetched:      usize,
    pub normalized:   usize,
    pub skipped:      usize,
    pub new_matches:  Vec<String>,
    pub facts_sent:   usize,
    pub facts_failed: usize,
    pub committed:    bool,
}

// ── Dispatcher ───────────────────────────────────────────────────────────────

pub struct Dispatcher<S, K> {
    source:   S,
    sink:     K,
    store:    HistoryStore,
    events:   EventLogger,
    exporter: Option<Exporter>,
    settings: CycleSettings,
}

impl<S: MatchSource, K: FactSink> Dispatcher<S, K> {
    pub fn new(
        source:   S,
        sink:     K,
        store:    HistoryStore,
        events:   EventLogger,
        exporter: Option<Exporter>,
        settings: CycleSettings,
    ) -> Self {
        Self { source, sink, store, events, exporter, settings }
    }

    /// Polls until `shutdown` resolves. A shutdown during a cycle abandons it
    /// at its next await point; history writes have none, so they finish.
    pub async fn run<F: Future<Output = ()>>(&self, interval: Duration, shutdown: F) {
        tokio::pin!(shutdown);
        info!(
            club = %self.settings.club_id,
            match_type = %self.settings.match_type,
            "Polling every {}s",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, abandoning in-flight cycle");
                    return;
                }
                report = self.run_cycle() => {
                    debug!(?report, "cycle finished");
                }
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    return;
                }
                _ = sleep(interval) => {}
            }
        }
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();
        info!("--- Checking for new matches ---");

        // 1. Fetch
        let club_id = self.settings.club_id.as_str();
        let raw = match self
            .source
            .fetch_matches(club_id, self.settings.match_type, self.settings.max_results)
            .await
        {
            Ok(raw) => {
                self.log_api(true, "ok".into(), raw.len());
                raw
            }
            Err(e) => {
                warn!("✗ Match fetch failed, retrying next tick: {e:#}");
                self.log_api(false, format!("{e:#}"), 0);
                report.outcome = CycleOutcome::FetchFailed;
                return self.finish(report);
            }
        };
        report.fetched = raw.len();

        // 2. Normalize
        let batch = self.normalize_batch(&raw, &mut report);
        if batch.is_empty() {
            info!("✗ No matches returned from API");
            report.outcome = CycleOutcome::NoMatches;
            return self.finish(report);
        }
        self.export(|ex| ex.export_batch(&batch));

        // 3. Detect
        let known = match self.store.match_ids_known() {
            Ok(known) => known,
            Err(e) => {
                error!(path = %self.store.path().display(), "History unreadable, skipping cycle: {e}");
                report.outcome = CycleOutcome::HistoryUnavailable;
                return self.finish(report);
            }
        };
        if known.is_empty() {
            info!("✓ No existing history found. All current matches are new.");
        }

        let changes = detect_new_matches(&batch, &known);
        let Some(newest) = changes.most_recent() else {
            info!("✓ No new matches detected");
            report.outcome = CycleOutcome::NoNewMatches;
            return self.finish(report);
        };

        info!("✓ Detected {} new match(es)", changes.new_matches.len());
        for m in &changes.new_matches {
            let _ = self.events.log(&MatchDetectedEvent {
                ts:        now_iso(),
                event:     "MATCH_DETECTED",
                match_id:  m.match_id.clone(),
                played_at: m.played_at(),
                clubs:     m.club_ids(),
                players:   m.player_count(),
            });
        }
        report.new_matches = changes.match_ids().into_iter().map(String::from).collect();

        // 4. Extract, commit, deliver
        let facts = extract_facts(newest, club_id, &self.settings.tracked_stats);
        if facts.is_empty() {
            warn!(match_id = %newest.match_id, "Club {club_id} has no players in the newest match");
        }

        report.committed = self.commit(&batch);
        self.export(|ex| ex.export_newest(newest));

        self.deliver_all(newest, &facts, &mut report).await;

        report.outcome = CycleOutcome::Dispatched;
        self.finish(report)
    }

    fn normalize_batch(&self, raw: &[Value], report: &mut CycleReport) -> Vec<Match> {
        let mut batch = Vec::with_capacity(raw.len());
        for (index, record) in raw.iter().enumerate() {
            match normalize_record(record, self.settings.utc_offset) {
                Ok(m) => batch.push(m),
                Err(e) => {
                    let match_id = record_match_id(record);
                    warn!(index, match_id = ?match_id, "Skipping record: {e}");
                    let _ = self.events.log(&RecordSkippedEvent {
                        ts:     now_iso(),
                        event:  "RECORD_SKIPPED",
                        index,
                        match_id,
                        reason: e.to_string(),
                    });
                    report.skipped += 1;
                }
            }
        }
        report.normalized = batch.len();
        batch
    }

    /// History rows for the whole batch, not only the new matches.
    fn commit(&self, batch: &[Match]) -> bool {
        let rows = entries_for_batch(batch);
        let path = self.store.path().display().to_string();

        match self.store.merge(&rows) {
            Ok(outcome) => {
                let _ = self.events.log(&HistoryCommitEvent {
                    ts:          now_iso(),
                    event:       "HISTORY_COMMIT",
                    path,
                    ok:          true,
                    rows_merged: outcome.merged,
                    rows_total:  outcome.total,
                    message:     "ok".into(),
                });
                true
            }
            Err(e) => {
                error!(
                    path = %path,
                    "!!! History commit FAILED, these matches will be reported as new again next cycle: {e}"
                );
                let _ = self.events.log(&HistoryCommitEvent {
                    ts:          now_iso(),
                    event:       "HISTORY_COMMIT",
                    path,
                    ok:          false,
                    rows_merged: 0,
                    rows_total:  0,
                    message:     e.to_string(),
                });
                false
            }
        }
    }

    /// Sequential, best effort: a failed fact is logged and the rest still go.
    async fn deliver_all(&self, m: &Match, facts: &[FactPayload], report: &mut CycleReport) {
        for (i, fact) in facts.iter().enumerate() {
            let seq = i + 1;
            let (ok, message) = match self.sink.deliver(fact).await {
                Ok(reply) => {
                    info!("Sent payload: {fact} | Response: {reply}");
                    report.facts_sent += 1;
                    (true, reply)
                }
                Err(e) => {
                    warn!(match_id = %m.match_id, seq, "✗ Fact NOT delivered: {fact} ({e:#})");
                    report.facts_failed += 1;
                    (false, format!("{e:#}"))
                }
            };

            let _ = self.events.log(&FactDeliveryEvent {
                ts:       now_iso(),
                event:    "FACT_DELIVERY",
                match_id: m.match_id.clone(),
                seq,
                payload:  fact.to_string(),
                ok,
                message,
            });
        }
    }

    fn export<F>(&self, write: F)
    where
        F: FnOnce(&Exporter) -> Result<std::path::PathBuf>,
    {
        if let Some(exporter) = &self.exporter {
            match write(exporter) {
                Ok(path) => info!("✓ Exported {}", path.display()),
                Err(e) => warn!("Export failed: {e:#}"),
            }
        }
    }

    fn log_api(&self, ok: bool, message: String, items: usize) {
        let _ = self.events.log(&ApiStatusEvent {
            ts:      now_iso(),
            event:   "API_STATUS",
            source:  "proclubs".to_string(),
            scope:   self.settings.club_id.clone(),
            ok,
            message,
            items,
        });
    }

    fn finish(&self, report: CycleReport) -> CycleReport {
        let _ = self.events.log(&CycleHeartbeatEvent {
            ts:           now_iso(),
            event:        "CYCLE_HEARTBEAT",
            outcome:      report.outcome.as_str().to_string(),
            fetched:      report.fetched,
            normalized:   report.normalized,
            skipped:      report.skipped,
            new_matches:  report.new_matches.len(),
            facts_sent:   report.facts_sent,
            facts_failed: report.facts_failed,
            committed:    report.committed,
        });

        info!(
            outcome = report.outcome.as_str(),
            fetched = report.fetched,
            skipped = report.skipped,
            new = report.new_matches.len(),
            sent = report.facts_sent,
            failed = report.facts_failed,
            "Cycle completed"
        );
        report
    }
}
