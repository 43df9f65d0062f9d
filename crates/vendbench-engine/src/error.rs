//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Wraps each subsystem error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: vendbench_core::ConfigError,
    },

    /// The orchestrator rejected an operation.
    #[error("orchestrator error: {source}")]
    Orchestrator {
        /// The underlying orchestrator error.
        #[from]
        source: vendbench_core::OrchestratorError,
    },

    /// Logging could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the failure.
        message: String,
    },

    /// An operator command could not be understood.
    #[error("console error: {message}")]
    Console {
        /// Description of the bad command.
        message: String,
    },
}
