//! Error type for the orchestrator API.

use vendbench_agents::AgentError;
use vendbench_runner::RunnerError;

use crate::config::ConfigError;
use crate::control::RunPhase;

/// Errors returned by [`Orchestrator`](crate::Orchestrator) operations.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The operation is not allowed in the current phase.
    #[error("cannot {operation} while {from}")]
    InvalidTransition {
        /// Phase the run was in.
        from: RunPhase,
        /// The rejected operation.
        operation: &'static str,
    },

    /// An argument was out of range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What is wrong.
        message: String,
    },

    /// Configuration could not be turned into a runnable setup.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// Backend construction, prompt rendering, or state serialization failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: RunnerError,
    },

    /// Agent machinery could not be built.
    #[error("agent error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: AgentError,
    },
}
