//! Actions proposed by the decision agent and the turn records it keeps.
//!
//! An [`Action`] is a tool name plus opaque JSON parameters; exactly one is
//! produced per turn. A [`Turn`] is the decision agent's history record of a
//! completed action, carrying its token cost for context pruning.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire names of the tools the execution agent understands.
pub mod tools {
    /// No-op tool; also the degraded result of unusable decisions.
    pub const IDLE: &str = "idle";
    /// Requests operator guidance; suspends the loop when enabled.
    pub const ASK_FOR_HUMAN_HELP: &str = "ask_for_human_help";
    /// Closes the current day: sales pass, then the daily fee.
    pub const WAIT_FOR_NEXT_DAY: &str = "wait_for_next_day";
    /// Places a supplier order for catalog items.
    pub const PURCHASE_FROM_SUPPLIER: &str = "purchase_from_supplier";
    /// Sets sale prices on storage and machine items.
    pub const SET_PRICES: &str = "set_prices";
    /// Moves stock from storage into the vending machine.
    pub const RESTOCK_MACHINE: &str = "restock_machine";
    /// Moves machine cash into the main cash balance.
    pub const COLLECT_CASH: &str = "collect_cash";
    /// Dumps both inventories as JSON.
    pub const VIEW_INVENTORY: &str = "view_inventory";
    /// Reports the main cash balance.
    pub const GET_MONEY_BALANCE: &str = "get_money_balance";
    /// Answers market-research queries from a fixed table.
    pub const INTERNET_SEARCH: &str = "internet_search";
    /// Reads and consumes the inbox.
    pub const READ_EMAIL: &str = "read_email";
    /// Sends an email to a business contact.
    pub const SEND_EMAIL: &str = "send_email";
    /// Lists sent mail and the current inbox.
    pub const VIEW_EMAIL_HISTORY: &str = "view_email_history";
    /// Writes to the scratchpad, key/value store, or note store.
    pub const WRITE_TO_MEMORY: &str = "write_to_memory";
    /// Reads from the scratchpad, key/value store, or note store.
    pub const READ_FROM_MEMORY: &str = "read_from_memory";
}

/// A single proposed action: which tool to run and with what parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Tool name as registered in the tool registry.
    pub tool: String,
    /// Structured parameters handed to the tool unchanged.
    #[serde(default = "empty_parameters")]
    pub parameters: Value,
}

impl Action {
    /// Create an action for `tool` with the given parameters.
    pub fn new(tool: impl Into<String>, parameters: Value) -> Self {
        Self {
            tool: tool.into(),
            parameters,
        }
    }

    /// The no-op action.
    pub fn idle() -> Self {
        Self::new(tools::IDLE, empty_parameters())
    }

    /// Whether this action targets `tool`.
    pub fn is(&self, tool: &str) -> bool {
        self.tool == tool
    }

    /// Compact JSON rendering of the parameters.
    ///
    /// Object keys are sorted, so two actions with equal parameters always
    /// serialize identically.
    pub fn serialized_parameters(&self) -> String {
        self.parameters.to_string()
    }

    /// Compact JSON rendering of the whole action, as recorded in history.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "tool": self.tool,
            "parameters": self.parameters,
        })
        .to_string()
    }
}

fn empty_parameters() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One completed entry in the decision agent's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The agent's reasoning for the action.
    pub thought: String,
    /// The action taken, serialized as JSON.
    pub action: String,
    /// The textual result returned by the tool.
    pub result: String,
    /// Estimated token cost of this turn.
    pub tokens: usize,
}

impl Turn {
    /// Name of the tool recorded in [`action`](Self::action), if it parses.
    pub fn tool_name(&self) -> Option<String> {
        serde_json::from_str::<Value>(&self.action)
            .ok()?
            .get("tool")?
            .as_str()
            .map(ToOwned::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_action_has_empty_object_parameters() {
        let action = Action::idle();
        assert!(action.is(tools::IDLE));
        assert_eq!(action.serialized_parameters(), "{}");
    }

    #[test]
    fn parameter_serialization_is_key_order_independent() {
        let a = Action::new("set_prices", serde_json::json!({"b": 1, "a": 2}));
        let b = Action::new("set_prices", serde_json::json!({"a": 2, "b": 1}));
        assert_eq!(a.serialized_parameters(), b.serialized_parameters());
    }

    #[test]
    fn missing_parameters_default_to_empty_object() {
        let action: Action = serde_json::from_str(r#"{"tool": "collect_cash"}"#)
            .unwrap_or_else(|_| Action::new("broken", Value::Null));
        assert_eq!(action.tool, "collect_cash");
        assert!(action.parameters.is_object());
    }

    #[test]
    fn turn_tool_name_reads_action_json() {
        let turn = Turn {
            thought: String::from("restock"),
            action: Action::new(tools::WAIT_FOR_NEXT_DAY, serde_json::json!({})).to_json(),
            result: String::from("ok"),
            tokens: 4,
        };
        assert_eq!(turn.tool_name().as_deref(), Some(tools::WAIT_FOR_NEXT_DAY));

        let summary = Turn {
            thought: String::from("Summary"),
            action: String::from("{}"),
            result: String::new(),
            tokens: 0,
        };
        assert!(summary.tool_name().is_none());
    }
}
