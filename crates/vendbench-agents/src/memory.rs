//! Long-term agent memory.
//!
//! The decision agent's rolling history is pruned to fit its token budget;
//! [`MemoryStore`] is where it keeps what must survive that pruning:
//!
//! - **Scratchpad**: a single free-text buffer, overwritten on every update
//!   and shown in every decision prompt.
//! - **Key/value map**: exact-key recall.
//! - **Notes**: free text ranked by embedding similarity on search, capped
//!   at [`MAX_NOTES`] with the oldest evicted first.
//!
//! [`MemoryStore::reset`] clears the scratchpad and the key/value map but
//! keeps the notes, so lessons carry over between runs of one process.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use tracing::debug;
use vendbench_types::{MemoryEntry, MemoryId};

use crate::embedding::{cosine_similarity, embed};

/// Maximum number of notes retained.
pub const MAX_NOTES: usize = 1000;

/// Scratchpad, key/value map, and similarity-searchable notes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    scratchpad: String,
    values: BTreeMap<String, String>,
    notes: VecDeque<MemoryEntry>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the scratchpad and key/value map; notes are kept.
    pub fn reset(&mut self) {
        self.scratchpad.clear();
        self.values.clear();
    }

    // -----------------------------------------------------------------------
    // Scratchpad
    // -----------------------------------------------------------------------

    /// Current scratchpad text.
    pub fn scratchpad(&self) -> &str {
        &self.scratchpad
    }

    /// Replace the scratchpad text.
    pub fn update_scratchpad(&mut self, content: &str) {
        content.clone_into(&mut self.scratchpad);
    }

    // -----------------------------------------------------------------------
    // Key/value map
    // -----------------------------------------------------------------------

    /// Store `value` under `key`, replacing any previous value.
    pub fn save_value(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }

    /// Value stored under `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    // -----------------------------------------------------------------------
    // Notes
    // -----------------------------------------------------------------------

    /// Store a note and return its identifier.
    pub fn store_note(&mut self, text: &str) -> MemoryId {
        let entry = MemoryEntry {
            id: MemoryId::new(),
            text: text.to_owned(),
            embedding: embed(text),
            created_at: Utc::now(),
        };
        let id = entry.id;
        self.notes.push_back(entry);
        while self.notes.len() > MAX_NOTES {
            self.notes.pop_front();
        }
        debug!(note_id = %id, total = self.notes.len(), "Memory note stored");
        id
    }

    /// Up to `limit` notes most similar to `query`, best first.
    ///
    /// Ties keep insertion order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&MemoryEntry> {
        let query = embed(query);
        let mut scored: Vec<(f32, &MemoryEntry)> = self
            .notes
            .iter()
            .map(|entry| (cosine_similarity(&entry.embedding, &query), entry))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(limit).map(|(_, entry)| entry).collect()
    }

    /// Number of notes held.
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratchpad_is_overwritten() {
        let mut store = MemoryStore::new();
        store.update_scratchpad("first");
        store.update_scratchpad("second");
        assert_eq!(store.scratchpad(), "second");
    }

    #[test]
    fn values_round_trip_and_list_sorted() {
        let mut store = MemoryStore::new();
        store.save_value("supplier", "globalsnacks");
        store.save_value("best_seller", "soda");
        assert_eq!(store.value("supplier"), Some("globalsnacks"));
        assert_eq!(store.value("missing"), None);
        assert_eq!(store.keys(), vec!["best_seller", "supplier"]);
    }

    #[test]
    fn search_ranks_related_notes_first() {
        let mut store = MemoryStore::new();
        store.store_note("Machine maintenance is due on Tuesday");
        store.store_note("Soda sells out quickly at two dollars");
        store.store_note("Candy barely moves above one fifty");
        let hits = store.search("how fast does soda sell", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(
            hits.first().map(|e| e.text.as_str()),
            Some("Soda sells out quickly at two dollars")
        );
    }

    #[test]
    fn notes_are_capped_oldest_first() {
        let mut store = MemoryStore::new();
        for i in 0..=MAX_NOTES {
            store.store_note(&format!("note {i}"));
        }
        assert_eq!(store.note_count(), MAX_NOTES);
        assert!(store.search("note 0", MAX_NOTES).iter().all(|e| e.text != "note 0"));
    }

    #[test]
    fn reset_keeps_notes() {
        let mut store = MemoryStore::new();
        store.update_scratchpad("plan");
        store.save_value("k", "v");
        store.store_note("keep me");
        store.reset();
        assert_eq!(store.scratchpad(), "");
        assert!(store.keys().is_empty());
        assert_eq!(store.note_count(), 1);
    }
}
