//! Language-model decision making for the vending benchmark.
//!
//! Everything that talks to a model lives here: the provider backends, the
//! prompt templates, response parsing, and the three consumers built on
//! them (the decision agent, contact replies, and demand seeding).
//!
//! # Modules
//!
//! - [`config`] -- Provider selection and backend connection settings.
//! - [`llm`] -- [`LlmBackend`] enum dispatch over the HTTP providers and the offline scripted backend.
//! - [`prompt`] -- [`PromptEngine`]: built-in `minijinja` templates with directory overrides.
//! - [`parse`] -- Decision parsing with JSON recovery strategies.
//! - [`history`] -- [`TurnHistory`]: token-budgeted turn history with summarizing pruning.
//! - [`decision`] -- [`DecisionAgent`]: one action per turn, plus operator instruction translation.
//! - [`contacts`] -- [`ContactDirectory`] and [`ReplyGenerator`] for simulated email replies.
//! - [`demand`] -- Initial per-item demand profiles.
//! - [`error`] -- [`RunnerError`].

pub mod config;
pub mod contacts;
pub mod decision;
pub mod demand;
pub mod error;
pub mod history;
pub mod llm;
pub mod parse;
pub mod prompt;

pub use config::{LlmBackendConfig, Provider};
pub use contacts::{ContactDirectory, ReplyGenerator};
pub use decision::DecisionAgent;
pub use error::RunnerError;
pub use history::{PruneReport, TurnHistory, estimate_tokens};
pub use llm::{LlmBackend, ScriptedBackend, create_backend};
pub use parse::{ParsedDecision, parse_decision};
pub use prompt::{PromptEngine, PromptKind, RenderedPrompt};
