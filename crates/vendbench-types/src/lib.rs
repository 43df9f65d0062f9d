//! Shared type definitions for the vending benchmark simulation.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace: the mutable world state the orchestrator drives, the
//! inventories and items inside it, the immutable product catalog, and the
//! records the decision agent keeps about its own turns.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for run and memory identifiers
//! - [`action`] -- Proposed actions, tool-name constants, and turn records
//! - [`catalog`] -- Immutable product catalog (reference price, wholesale cost)
//! - [`item`] -- Items and their demand parameters
//! - [`inventory`] -- Storage and point-of-sale inventories
//! - [`state`] -- The world state, emails, and pending deliveries
//! - [`memory`] -- Long-term memory entries
//! - [`error`] -- Error type for state invariants

pub mod action;
pub mod catalog;
pub mod error;
pub mod ids;
pub mod inventory;
pub mod item;
pub mod memory;
pub mod state;

pub use action::{Action, Turn, tools};
pub use catalog::{CatalogEntry, ProductCatalog};
pub use error::TypesError;
pub use ids::{MemoryId, RunId};
pub use inventory::Inventory;
pub use item::{DemandProfile, Item};
pub use memory::MemoryEntry;
pub use state::{InboundEmail, PendingDeliveries, SentEmail, WorldState};
