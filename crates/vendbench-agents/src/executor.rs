//! The execution agent: resolves a proposed action to its tool and runs it.
//!
//! Dispatch never fails outward. An unknown tool, a refused request, and
//! even a panicking handler all come back as an `Error: ...` result string
//! that the decision agent reads on its next turn.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error, info};
use vendbench_types::Action;

use crate::tools::{ToolContext, ToolRegistry};

/// Pure dispatcher over a [`ToolRegistry`].
#[derive(Debug)]
pub struct ExecutionAgent {
    registry: ToolRegistry,
}

impl ExecutionAgent {
    /// Create an executor over `registry`.
    pub const fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Names of the available tools, sorted.
    pub fn tool_names(&self) -> Vec<String> {
        self.registry.names().into_iter().map(str::to_owned).collect()
    }

    /// Run `action` and return its result text.
    pub fn run(&self, action: &Action, ctx: &mut ToolContext<'_>) -> String {
        let Some(handler) = self.registry.get(&action.tool) else {
            info!(tool = %action.tool, "Unknown tool requested");
            return format!(
                "Error: Execution agent was asked to execute an unknown tool: {}",
                action.tool
            );
        };

        debug!(tool = %action.tool, params = %action.parameters, "Executing tool");
        match catch_unwind(AssertUnwindSafe(|| handler.execute(&action.parameters, ctx))) {
            Ok(Ok(result)) => {
                info!(tool = %action.tool, "Tool call succeeded");
                result
            }
            Ok(Err(e)) => {
                info!(tool = %action.tool, error = %e, "Tool call refused");
                format!("Error: {e}")
            }
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_owned())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| String::from("unknown failure"));
                error!(tool = %action.tool, detail = %detail, "Tool handler panicked");
                format!("Error executing tool '{}': {detail}", action.tool)
            }
        }
    }
}
