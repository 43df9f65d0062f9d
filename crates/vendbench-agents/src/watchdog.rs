//! Repeated-action ("meltdown") detection.
//!
//! The watchdog remembers the last `window` actions. A meltdown is the most
//! recent `threshold` of them being identical in both tool name and
//! serialized parameters. It only flags; halting is the caller's job.

use std::collections::VecDeque;

use tracing::warn;
use vendbench_types::Action;

use crate::error::AgentError;

/// Sliding-window detector for an agent stuck repeating itself.
#[derive(Debug, Clone)]
pub struct SafetyWatchdog {
    window: usize,
    threshold: usize,
    recent: VecDeque<(String, String)>,
}

impl SafetyWatchdog {
    /// Create a watchdog; `threshold` must be in `1..=window`.
    pub fn new(window: usize, threshold: usize) -> Result<Self, AgentError> {
        if threshold == 0 || threshold > window {
            return Err(AgentError::InvalidWatchdog { window, threshold });
        }
        Ok(Self {
            window,
            threshold,
            recent: VecDeque::with_capacity(window),
        })
    }

    /// Remember `action`, forgetting the oldest once the window is full.
    pub fn record(&mut self, action: &Action) {
        self.recent
            .push_back((action.tool.clone(), action.serialized_parameters()));
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
    }

    /// Whether the last `threshold` recorded actions are all identical.
    pub fn is_meltdown_detected(&self) -> bool {
        let Some(skip) = self.recent.len().checked_sub(self.threshold) else {
            return false;
        };
        let mut tail = self.recent.iter().skip(skip);
        let Some(first) = tail.next() else {
            return false;
        };
        let stuck = tail.all(|entry| entry == first);
        if stuck {
            warn!(
                tool = %first.0,
                threshold = self.threshold,
                "Repeated identical actions detected"
            );
        }
        stuck
    }

    /// Forget every recorded action.
    pub fn reset(&mut self) {
        self.recent.clear();
    }

    /// Number of actions currently remembered.
    pub fn len(&self) -> usize {
        self.recent.len()
    }

    /// Whether nothing has been recorded since creation or reset.
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }
}
