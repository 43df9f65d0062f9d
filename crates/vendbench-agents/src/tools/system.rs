//! Control tools that do not touch the world.

use serde_json::Value;

use super::{ToolContext, ToolHandler};
use crate::error::ToolError;

/// `idle`: do nothing this turn.
#[derive(Debug, Clone, Copy)]
pub struct Idle;

impl ToolHandler for Idle {
    fn execute(&self, _params: &Value, _ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        Ok(String::from("Agent is idle, thinking about its next move."))
    }
}

/// `ask_for_human_help`: the turn loop intercepts this action and pauses
/// for an operator; the handler only runs if dispatched directly.
#[derive(Debug, Clone, Copy)]
pub struct AskForHumanHelp;

impl ToolHandler for AskForHumanHelp {
    fn execute(&self, _params: &Value, _ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        Ok(String::from(
            "Agent has requested human intervention. The simulation is paused.",
        ))
    }
}
