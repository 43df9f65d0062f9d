//! Tool catalog: the verbs the decision agent can use.
//!
//! A tool is a [`ToolHandler`] registered under its wire name in a
//! [`ToolRegistry`]. Handlers take the action's raw JSON parameters plus a
//! [`ToolContext`] borrowing the live world state, and return the result
//! text shown to the agent. Refusals come back as [`ToolError`]; the
//! [`ExecutionAgent`](crate::ExecutionAgent) turns those into `Error: ...`
//! strings so nothing is ever raised past the dispatch boundary.
//!
//! # Submodules
//!
//! - [`vending`] -- Prices, restocking, cash collection, inventory, day advance.
//! - [`remote`] -- Balance, web search, supplier orders, email.
//! - [`memory`] -- Scratchpad, key/value, and note access.
//! - [`system`] -- Idle and human-help requests.

pub mod memory;
pub mod remote;
pub mod system;
pub mod vending;

use std::collections::BTreeMap;

use rand::RngCore;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use vendbench_types::{WorldState, tools};
use vendbench_world::{EconomicModel, SupplierPolicy};

use crate::error::ToolError;
use crate::memory::MemoryStore;

// ---------------------------------------------------------------------------
// Handler interface
// ---------------------------------------------------------------------------

/// Everything a handler may read or mutate while it runs.
pub struct ToolContext<'a> {
    /// The live world state.
    pub state: &'a mut WorldState,
    /// The agent's long-term memory.
    pub memory: &'a mut MemoryStore,
    /// Randomness for stochastic tools.
    pub rng: &'a mut dyn RngCore,
}

/// A single registered tool.
pub trait ToolHandler: Send + Sync {
    /// Run the tool and return its result text.
    fn execute(&self, params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError>;
}

/// Operating limits enforced by the vending tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolLimits {
    /// Maximum units across all items in the vending machine.
    pub max_machine_capacity: u32,
    /// Lowest price an item may be set to.
    pub min_item_price: Decimal,
    /// Highest price an item may be set to.
    pub max_item_price: Decimal,
    /// Largest quantity accepted on one order or restock line.
    pub max_order_quantity: u32,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            max_machine_capacity: 200,
            min_item_price: Decimal::new(1, 2),
            max_item_price: Decimal::new(50, 0),
            max_order_quantity: 10_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Name-to-handler map.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: BTreeMap<String, Box<dyn ToolHandler>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full tool catalog.
    ///
    /// `ask_for_human_help` is registered only when `human_help_enabled`.
    pub fn standard(limits: &ToolLimits, human_help_enabled: bool) -> Self {
        let supplier = SupplierPolicy {
            max_quantity: limits.max_order_quantity,
            ..SupplierPolicy::default()
        };

        let mut registry = Self::new();
        registry.register(tools::SET_PRICES, vending::SetPrices::new(limits.clone()));
        registry.register(tools::RESTOCK_MACHINE, vending::RestockMachine::new(limits.clone()));
        registry.register(tools::COLLECT_CASH, vending::CollectCash);
        registry.register(tools::VIEW_INVENTORY, vending::ViewInventory);
        registry.register(
            tools::WAIT_FOR_NEXT_DAY,
            vending::WaitForNextDay::new(EconomicModel::new()),
        );
        registry.register(tools::GET_MONEY_BALANCE, remote::GetMoneyBalance);
        registry.register(tools::INTERNET_SEARCH, remote::InternetSearch);
        registry.register(
            tools::PURCHASE_FROM_SUPPLIER,
            remote::PurchaseFromSupplier::new(supplier),
        );
        registry.register(tools::READ_EMAIL, remote::ReadEmail);
        registry.register(tools::SEND_EMAIL, remote::SendEmail);
        registry.register(tools::VIEW_EMAIL_HISTORY, remote::ViewEmailHistory);
        registry.register(tools::WRITE_TO_MEMORY, memory::WriteToMemory);
        registry.register(tools::READ_FROM_MEMORY, memory::ReadFromMemory);
        registry.register(tools::IDLE, system::Idle);
        if human_help_enabled {
            registry.register(tools::ASK_FOR_HUMAN_HELP, system::AskForHumanHelp);
        }
        registry
    }

    /// Register `handler` under `name`, replacing any previous handler.
    pub fn register(&mut self, name: &str, handler: impl ToolHandler + 'static) {
        self.handlers.insert(name.to_owned(), Box::new(handler));
    }

    /// Handler registered under `name`.
    pub fn get(&self, name: &str) -> Option<&dyn ToolHandler> {
        self.handlers.get(name).map(AsRef::as_ref)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

/// Array parameter `key`, if present and an array.
fn array_param<'p>(params: &'p Value, key: &str) -> Option<&'p [Value]> {
    params.get(key).and_then(Value::as_array).map(Vec::as_slice)
}

/// String parameter `key`, or `""` when absent or not a string.
fn str_param<'p>(params: &'p Value, key: &str) -> &'p str {
    params.get(key).and_then(Value::as_str).unwrap_or("")
}

/// A JSON number or numeric string as a decimal.
fn decimal_value(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A JSON integer or integer string.
fn integer_value(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
