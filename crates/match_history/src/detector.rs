//! New-match detection by match id only. Read-only: nothing here touches the
//! store, so a call can be repeated freely.

use std::collections::HashSet;

use match_parser::Match;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeSet {
    /// Unseen matches in fetch order (most recent first).
    pub new_matches: Vec<Match>,
}

impl ChangeSet {
    pub fn any_new(&self) -> bool {
        !self.new_matches.is_empty()
    }

    pub fn most_recent(&self) -> Option<&Match> {
        self.new_matches.first()
    }

    pub fn match_ids(&self) -> Vec<&str> {
        self.new_matches.iter().map(|m| m.match_id.as_str()).collect()
    }
}

/// A match is new iff its id is not in `known`. With an empty `known` set
/// (first run) the whole batch is new. Repeated ids within one batch are
/// reported once.
pub fn detect_new_matches(batch: &[Match], known: &HashSet<String>) -> ChangeSet {
    let mut seen_in_batch: HashSet<&str> = HashSet::new();
    let mut new_matches = Vec::new();
    for m in batch {
        if seen_in_batch.insert(m.match_id.as_str()) && !known.contains(&m.match_id) {
            new_matches.push(m.clone());
        }
    }

    ChangeSet { new_matches }
}
