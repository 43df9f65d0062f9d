//! Agent-side machinery for the vending benchmark.
//!
//! This crate holds everything the turn loop needs to act on a decision
//! without talking to a language model: long-term memory, the repeated
//! action watchdog, the tool catalog, and the executor that dispatches a
//! proposed [`Action`] to its tool.
//!
//! # Modules
//!
//! - [`embedding`] -- Deterministic local text embeddings and cosine similarity.
//! - [`memory`] -- [`MemoryStore`]: scratchpad, key/value map, and similarity-searchable notes.
//! - [`watchdog`] -- [`SafetyWatchdog`]: sliding-window meltdown detection.
//! - [`tools`] -- [`ToolHandler`] trait, [`ToolRegistry`], and every tool handler.
//! - [`executor`] -- [`ExecutionAgent`]: pure dispatch from action to result text.
//! - [`error`] -- Error types ([`AgentError`], [`ToolError`]).
//!
//! [`Action`]: vendbench_types::Action

pub mod embedding;
pub mod error;
pub mod executor;
pub mod memory;
pub mod tools;
pub mod watchdog;

pub use error::{AgentError, ToolError};
pub use executor::ExecutionAgent;
pub use memory::MemoryStore;
pub use tools::{ToolContext, ToolHandler, ToolLimits, ToolRegistry};
pub use watchdog::SafetyWatchdog;
