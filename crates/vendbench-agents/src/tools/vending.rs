//! Tools operating the vending machine and its storage.

use serde_json::Value;
use tracing::info;
use vendbench_types::Inventory;
use vendbench_world::validation::{validate_item_name, validate_price, validate_quantity};
use vendbench_world::{EconomicModel, ValidationError, close_day};

use super::{ToolContext, ToolHandler, ToolLimits, array_param, decimal_value, integer_value};
use crate::error::ToolError;

// ---------------------------------------------------------------------------
// set_prices
// ---------------------------------------------------------------------------

/// `set_prices {prices: [{name, price}]}`: reprice items in both inventories.
#[derive(Debug, Clone)]
pub struct SetPrices {
    limits: ToolLimits,
}

impl SetPrices {
    /// Create the tool with the configured price range.
    pub const fn new(limits: ToolLimits) -> Self {
        Self { limits }
    }
}

impl ToolHandler for SetPrices {
    fn execute(&self, params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let lines = array_param(params, "prices").ok_or_else(|| {
            ToolError::missing(
                "'prices' array parameter is required, with each element having a 'name' and 'price'.",
            )
        })?;

        let mut report = Vec::new();
        let mut applied = 0_usize;
        for line in lines {
            let name = line.get("name").and_then(Value::as_str).unwrap_or("");
            let checked = validate_item_name(name).and_then(|_| {
                let price = decimal_value(line.get("price")).ok_or(ValidationError::InvalidPrice)?;
                validate_price(price, self.limits.min_item_price, self.limits.max_item_price)
            });
            let price = match checked {
                Ok(price) => price.round_dp(2),
                Err(e) => {
                    report.push(format!("Failed to set price for {name}: {e}"));
                    continue;
                }
            };

            let mut found = false;
            if let Some(item) = ctx.state.machine.item_mut(name) {
                item.price = price;
                found = true;
            }
            if let Some(item) = ctx.state.storage.item_mut(name) {
                item.price = price;
                found = true;
            }
            if found {
                applied = applied.saturating_add(1);
                report.push(format!("Price for {name} set to ${price:.2}."));
            } else {
                report.push(format!("Failed to set price for {name}: Item not found."));
            }
        }

        if applied == 0 {
            return Err(ToolError::NothingApplied {
                message: String::from("No valid items were provided to set prices for."),
            });
        }
        Ok(report.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// restock_machine
// ---------------------------------------------------------------------------

/// `restock_machine {items: [{name, quantity}]}`: move stock from storage
/// into the machine.
#[derive(Debug, Clone)]
pub struct RestockMachine {
    limits: ToolLimits,
}

impl RestockMachine {
    /// Create the tool with the configured machine capacity.
    pub const fn new(limits: ToolLimits) -> Self {
        Self { limits }
    }
}

impl ToolHandler for RestockMachine {
    fn execute(&self, params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let lines = array_param(params, "items").ok_or_else(|| {
            ToolError::missing("'items' array parameter is required for restock_machine.")
        })?;

        let capacity = u64::from(self.limits.max_machine_capacity);
        let mut loaded = ctx.state.machine.total_units();
        let mut report = Vec::new();
        let mut moved_lines = 0_usize;

        for line in lines {
            let (Some(name), Some(requested)) = (
                line.get("name").and_then(Value::as_str),
                integer_value(line.get("quantity")),
            ) else {
                continue;
            };
            let quantity = match validate_item_name(name)
                .and_then(|_| validate_quantity(requested, self.limits.max_order_quantity))
            {
                Ok(q) => q,
                Err(e) => {
                    report.push(format!("Skipped {name}: {e}."));
                    continue;
                }
            };
            if quantity == 0 {
                report.push(format!("Skipped {name} (quantity not positive)."));
                continue;
            }
            if loaded.saturating_add(u64::from(quantity)) > capacity {
                report.push(format!("Skipped {name}: Would exceed vending machine capacity."));
                continue;
            }
            let Some(stored) = ctx.state.storage.item(name).filter(|i| i.quantity > 0) else {
                report.push(format!("Failed to restock {name}: Not available in storage."));
                continue;
            };

            let amount = quantity.min(stored.quantity);
            let mut batch = stored.clone();
            batch.quantity = amount;
            ctx.state.storage.remove_stock(name, amount);
            ctx.state.machine.insert_item(batch);

            loaded = loaded.saturating_add(u64::from(amount));
            moved_lines = moved_lines.saturating_add(1);
            report.push(format!("Successfully moved {amount} of {name} to vending machine."));
        }

        if moved_lines == 0 {
            return Err(ToolError::NothingApplied {
                message: String::from("No valid items were provided to restock."),
            });
        }
        Ok(report.join("\n"))
    }
}

// ---------------------------------------------------------------------------
// collect_cash / view_inventory
// ---------------------------------------------------------------------------

/// `collect_cash`: move the machine's cash box into the main balance.
#[derive(Debug, Clone, Copy)]
pub struct CollectCash;

impl ToolHandler for CollectCash {
    fn execute(&self, _params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let collected = ctx.state.machine.take_cash();
        if collected.is_zero() || collected.is_sign_negative() {
            return Ok(String::from("No cash to collect from the vending machine."));
        }
        ctx.state.cash_balance = ctx.state.cash_balance.saturating_add(collected);
        Ok(format!(
            "Collected ${collected:.2} from the vending machine. New main balance is ${:.2}.",
            ctx.state.cash_balance
        ))
    }
}

/// `view_inventory`: both inventories as pretty JSON.
#[derive(Debug, Clone, Copy)]
pub struct ViewInventory;

impl ToolHandler for ViewInventory {
    fn execute(&self, _params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let render = |value: &Inventory| {
            serde_json::to_string_pretty(value)
                .map_err(|_e| ToolError::rejected("Could not serialize inventory data."))
        };
        let storage = render(&ctx.state.storage)?;
        let machine = render(&ctx.state.machine)?;
        Ok(format!(
            "Current Inventories:\n---STORAGE---\n{storage}\n---VENDING MACHINE---\n{machine}"
        ))
    }
}

// ---------------------------------------------------------------------------
// wait_for_next_day
// ---------------------------------------------------------------------------

/// `wait_for_next_day`: close the day (sales pass, then the daily fee).
#[derive(Debug, Clone)]
pub struct WaitForNextDay {
    model: EconomicModel,
}

impl WaitForNextDay {
    /// Create the tool around a demand model.
    pub const fn new(model: EconomicModel) -> Self {
        Self { model }
    }
}

impl ToolHandler for WaitForNextDay {
    fn execute(&self, _params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let report = close_day(&mut *ctx.state, &self.model, &mut *ctx.rng);
        info!(day = report.new_day, "Agent waited for the next day");
        let mut text = report.summary();
        if !report.sales.lines.is_empty() {
            text.push('\n');
            text.push_str(report.sales.details().trim_end());
        }
        Ok(text)
    }
}
