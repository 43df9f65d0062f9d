//! Bounded in-memory log of recent simulation events.
//!
//! Every event is also emitted through `tracing` at a level fixed by its
//! kind, so the log file and the in-memory view tell the same story.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Number of events kept for readers.
pub const EVENT_LOG_CAPACITY: usize = 200;

/// Category of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Run setup: backends, demand profiles.
    SimulationSetup,
    /// A turn began.
    TurnStarted,
    /// The decision agent chose an action.
    ToolCall,
    /// A tool returned its result.
    ToolResult,
    /// Supplier stock reached storage.
    DeliveryReceived,
    /// A contact replied to an email.
    EmailReceived,
    /// Old history was summarized away.
    ContextPruned,
    /// An operator acted, or the agent asked for one.
    HumanIntervention,
    /// Repeated identical actions halted the run.
    Meltdown,
    /// The run finished or changed phase.
    SimulationStatus,
    /// An internal failure.
    Error,
}

/// One logged event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventEntry {
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Event category.
    pub kind: EventKind,
    /// Component that produced it.
    pub source: String,
    /// Human-readable description.
    pub message: String,
}

/// Ring buffer of the most recent [`EVENT_LOG_CAPACITY`] events.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: Mutex<VecDeque<EventEntry>>,
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and keep an event, evicting the oldest beyond capacity.
    pub fn record(&self, kind: EventKind, source: &str, message: impl Into<String>) {
        let message = message.into();
        match kind {
            EventKind::ToolCall => debug!(source, kind = ?kind, "{message}"),
            EventKind::HumanIntervention => warn!(source, kind = ?kind, "{message}"),
            EventKind::Meltdown | EventKind::Error => error!(source, kind = ?kind, "{message}"),
            _ => info!(source, kind = ?kind, "{message}"),
        }

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= EVENT_LOG_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(EventEntry {
            timestamp: Utc::now(),
            kind,
            source: source.to_owned(),
            message,
        });
    }

    /// Copy of the retained events, oldest first.
    pub fn recent(&self) -> Vec<EventEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every event.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
