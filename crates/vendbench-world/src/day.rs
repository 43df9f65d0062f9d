//! Closing a simulated day.

use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use vendbench_types::WorldState;

use crate::economy::{EconomicModel, SalesReport};

/// What happened when a day closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayReport {
    /// The day whose sales were simulated.
    pub closed_day: u32,
    /// The day the state advanced to.
    pub new_day: u32,
    /// Customer sales for the closed day.
    pub sales: SalesReport,
    /// Fee deducted from the cash balance.
    pub fee: Decimal,
}

impl DayReport {
    /// One-line result shown to the decision agent.
    pub fn summary(&self) -> String {
        format!(
            "Advanced to Day {}. Today's sales: {} units sold for a total of ${:.2}. Daily fee of ${:.2} deducted.",
            self.new_day, self.sales.units_sold, self.sales.revenue, self.fee
        )
    }
}

/// Close the current day.
///
/// Runs the sales pass for the day being closed, adds the units to the
/// cumulative total, then advances the day and deducts the daily fee.
pub fn close_day<R: Rng + ?Sized>(
    state: &mut WorldState,
    model: &EconomicModel,
    rng: &mut R,
) -> DayReport {
    let closed_day = state.day;
    let sales = model.run_sales_pass(&mut state.machine, closed_day, rng);
    state.total_units_sold = state
        .total_units_sold
        .saturating_add(u64::from(sales.units_sold));
    let new_day = state.advance_day();
    info!(
        closed_day,
        new_day,
        units_sold = sales.units_sold,
        revenue = %sales.revenue,
        cash_balance = %state.cash_balance,
        "Day closed"
    );
    DayReport {
        closed_day,
        new_day,
        sales,
        fee: state.daily_fee,
    }
}
