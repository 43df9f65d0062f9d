//! Error types for the vendbench-agents crate.
//!
//! [`ToolError`] display strings are what the decision agent reads: the
//! [`ExecutionAgent`](crate::ExecutionAgent) prefixes them with `Error: `
//! and returns them as the turn result.

use vendbench_world::{OrderError, ValidationError};

/// Errors raised while constructing agent components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// Watchdog threshold is zero or larger than its window.
    #[error("meltdown threshold {threshold} must be between 1 and the window size {window}")]
    InvalidWatchdog {
        /// Number of actions remembered.
        window: usize,
        /// Number of identical trailing actions that trips the watchdog.
        threshold: usize,
    },
}

/// A tool refused or failed to run. State is unchanged on every variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// A required parameter was absent or had the wrong shape.
    #[error("{message}")]
    MissingParameter {
        /// Agent-facing description of what is required.
        message: String,
    },

    /// A parameter failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The supplier refused the order.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// No line of a multi-item request could be applied.
    #[error("{message}")]
    NothingApplied {
        /// Agent-facing description.
        message: String,
    },

    /// The request was well formed but cannot be satisfied.
    #[error("{message}")]
    Rejected {
        /// Agent-facing description.
        message: String,
    },
}

impl ToolError {
    /// Shorthand for [`ToolError::MissingParameter`].
    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingParameter {
            message: message.into(),
        }
    }

    /// Shorthand for [`ToolError::Rejected`].
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}
