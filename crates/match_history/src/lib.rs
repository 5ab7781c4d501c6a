//! ProClubs Tracker: Match History
//!
//! Persisted `(matchId, playerId)` ledger and the new-match detector that
//! reads it. The store is the only writer of the history file.

pub mod detector;
pub mod entry;
pub mod store;

pub use detector::{detect_new_matches, ChangeSet};
pub use entry::{entries_for_batch, HistoryEntry};
pub use store::{HistoryError, HistoryStore, MergeOutcome};
