//! Append-only log of past decisions and their chosen outcomes.
//!
//! Entries are never mutated, deleted, or reordered; the only write is an
//! append through [`DecisionHistory::record`], performed under `&mut self`
//! so a reader can never observe a partially constructed entry. The entry
//! sequence is plain serde data so the save layer can serialize it as-is.

use super::types::DecisionHistoryEntry;
use serde::{Deserialize, Serialize};

/// How many of the most recent entries contribute to relevance weighting.
const RECENT_WINDOW: usize = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionHistory {
    entries: Vec<DecisionHistoryEntry>,
}

impl DecisionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a previously serialized entry sequence.
    pub fn from_entries(entries: Vec<DecisionHistoryEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry. The sole mutation this type allows.
    pub fn record(&mut self, entry: DecisionHistoryEntry) {
        self.entries.push(entry);
    }

    /// All entries, chronological, oldest first.
    pub fn entries(&self) -> &[DecisionHistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recency-weighted overlap between the given tags and the tags of
    /// recent entries, scaled by each entry's recorded relevance. Pure
    /// function of the entry sequence; past entries are never touched.
    pub fn recent_tag_weight(&self, tags: &[String]) -> f32 {
        if tags.is_empty() {
            return 0.0;
        }

        let recent = self
            .entries
            .iter()
            .rev()
            .take(RECENT_WINDOW)
            .enumerate();

        let mut weight = 0.0;
        for (age, entry) in recent {
            let overlap = entry
                .tags
                .iter()
                .filter(|tag| tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
                .count();
            if overlap > 0 {
                // Newest entry carries full weight, older ones decay.
                let recency = 1.0 - age as f32 / RECENT_WINDOW as f32;
                weight += entry.relevance_score * recency * overlap.min(2) as f32 * 0.25;
            }
        }

        weight.clamp(0.0, 1.0)
    }
}
