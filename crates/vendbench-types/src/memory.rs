//! Long-term memory entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::MemoryId;

/// A note stored for similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier.
    pub id: MemoryId,
    /// The remembered text.
    pub text: String,
    /// Embedding vector of `text`.
    pub embedding: Vec<f32>,
    /// When the note was stored.
    pub created_at: DateTime<Utc>,
}
