//! Run phase and cancellation shared between the turn loop and callers.
//!
//! The phase lives in a [`watch`] channel so the loop can sleep on it:
//! while suspended it waits for any phase change instead of polling, and a
//! stop request wakes every waiter by touching the channel.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::info;

use crate::error::OrchestratorError;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunPhase {
    /// No run has been started, or the last one was reset.
    Idle,
    /// `start` is preparing state and backends.
    Initializing,
    /// The loop is playing turns.
    Running,
    /// An operator paused the loop.
    Paused,
    /// The agent asked for help and the loop waits for an operator.
    AwaitingHumanInput,
    /// The turn limit was reached.
    Finished,
    /// A meltdown or internal failure halted the run.
    Error,
}

impl RunPhase {
    /// Paused or awaiting human input.
    pub const fn is_suspended(self) -> bool {
        matches!(self, Self::Paused | Self::AwaitingHumanInput)
    }

    /// A run is in progress (possibly suspended).
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::Running | Self::Paused | Self::AwaitingHumanInput
        )
    }

    /// Finished or halted.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::AwaitingHumanInput => "awaiting human input",
            Self::Finished => "finished",
            Self::Error => "halted on error",
        };
        f.write_str(label)
    }
}

/// How a wait on a suspended run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The phase left the suspended states.
    Resumed,
    /// A stop was requested.
    Stopped,
    /// The deadline passed while still suspended.
    TimedOut,
}

/// Shared run phase plus a stop flag.
#[derive(Debug)]
pub struct RunControl {
    phase: watch::Sender<RunPhase>,
    stop_requested: AtomicBool,
}

impl RunControl {
    /// Control in [`RunPhase::Idle`].
    pub fn new() -> Self {
        let (phase, _) = watch::channel(RunPhase::Idle);
        Self {
            phase,
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    /// Receiver notified on every phase change.
    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    /// Set the phase unconditionally and return the previous one.
    pub fn set_phase(&self, to: RunPhase) -> RunPhase {
        let from = self.phase.send_replace(to);
        if from != to {
            info!(from = %from, to = %to, "Run phase changed");
        }
        from
    }

    /// Move to `to` if the current phase satisfies `allowed`, atomically.
    ///
    /// Returns the previous phase.
    pub fn transition(
        &self,
        operation: &'static str,
        to: RunPhase,
        allowed: impl Fn(RunPhase) -> bool,
    ) -> Result<RunPhase, OrchestratorError> {
        let mut from = RunPhase::Idle;
        let mut moved = false;
        self.phase.send_if_modified(|phase| {
            from = *phase;
            if allowed(*phase) {
                *phase = to;
                moved = true;
            }
            moved
        });
        if moved {
            info!(from = %from, to = %to, operation, "Run phase changed");
            Ok(from)
        } else {
            Err(OrchestratorError::InvalidTransition { from, operation })
        }
    }

    // -----------------------------------------------------------------------
    // Stop
    // -----------------------------------------------------------------------

    /// Ask the loop to stop and wake anything waiting on the phase.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.phase.send_modify(|_| {});
    }

    /// Clear a previous stop request.
    pub fn clear_stop(&self) {
        self.stop_requested.store(false, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Waiting
    // -----------------------------------------------------------------------

    /// Wait until the run leaves the suspended phases, a stop is requested,
    /// or `deadline` passes.
    pub async fn wait_while_suspended(&self, deadline: Option<Duration>) -> Wake {
        let mut rx = self.phase.subscribe();
        let wait = rx.wait_for(|phase| self.is_stop_requested() || !phase.is_suspended());
        let woke = match deadline {
            Some(limit) => tokio::time::timeout(limit, wait).await.is_ok(),
            None => wait.await.is_ok(),
        };
        if self.is_stop_requested() {
            Wake::Stopped
        } else if woke {
            Wake::Resumed
        } else {
            Wake::TimedOut
        }
    }

    /// Sleep for `delay` unless a stop arrives first. Returns whether the
    /// sleep was cut short by a stop.
    pub async fn sleep_unless_stopped(&self, delay: Duration) -> bool {
        let mut rx = self.phase.subscribe();
        tokio::select! {
            () = tokio::time::sleep(delay) => false,
            _ = rx.wait_for(|_| self.is_stop_requested()) => true,
        }
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}
