//! Configuration, run control, and orchestration for the vending benchmark.
//!
//! This crate owns the turn loop that drives a run: day rollover and
//! deliveries, one decision per turn on an isolated snapshot, the meltdown
//! watchdog, dispatch, and the pause and human-help state machine around
//! it.
//!
//! # Modules
//!
//! - [`config`] -- Loading `vendbench-config.yaml` into strongly-typed structs.
//! - [`control`] -- [`RunPhase`] and the shared [`RunControl`].
//! - [`events`] -- Bounded in-memory [`EventLog`].
//! - [`orchestrator`] -- [`Orchestrator`] lifecycle API and the turn loop.
//! - [`error`] -- [`OrchestratorError`].

pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod orchestrator;
mod simulation;

pub use config::{ConfigError, EngineConfig};
pub use control::{RunControl, RunPhase};
pub use error::OrchestratorError;
pub use events::{EventEntry, EventKind, EventLog};
pub use orchestrator::{Orchestrator, SimulationView};
