//! ProClubs Tracker: Match Parser
//!
//! Turns raw match records from the Pro Clubs API into typed entities and
//! derives the outbound fact strings for the sheet.
//!
//! - `literal`: safe decoder for the textual data-literal encoding of nested maps
//! - `model`: `Match`, `PlayerStat`, `StatKind`
//! - `normalize`: raw record → `Match`
//! - `facts`: `Match` → `FactPayload`s

pub mod facts;
pub mod literal;
pub mod model;
pub mod normalize;

pub use facts::{extract_facts, title_case, FactPayload, TRACKED_STATS};
pub use literal::{parse_literal, LiteralError};
pub use model::{ClubRoster, Match, PlayerStat, StatKind};
pub use normalize::{normalize_record, record_match_id, RecordError};
