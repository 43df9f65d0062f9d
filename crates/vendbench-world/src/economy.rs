//! Customer demand simulation for the vending machine.
//!
//! Each point-of-sale item with stock and a positive price sells
//!
//! ```text
//! demand = round(base_sales * (price / reference_price) ^ elasticity
//!                * day_multiplier * noise)
//! sales  = min(demand, quantity)
//! ```
//!
//! | factor           | value                                          |
//! |------------------|------------------------------------------------|
//! | `day_multiplier` | 1.5 on Saturday and Sunday, 1.0 otherwise      |
//! | `noise`          | uniform in `[0.8, 1.2]`                        |
//!
//! Simulated day `d` is the calendar date `1970-01-01 + d days`, so day 1
//! is a Friday and days 2 and 3 are the first weekend.
//!
//! A reference price of zero or less yields no demand. Elasticity is
//! expected to be negative so that raising the price lowers demand.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::debug;
use vendbench_types::{Inventory, Item};

/// Demand multiplier applied on weekends.
pub const WEEKEND_MULTIPLIER: f64 = 1.5;

/// Lower bound of the daily demand noise.
pub const NOISE_MIN: f64 = 0.8;

/// Upper bound of the daily demand noise.
pub const NOISE_MAX: f64 = 1.2;

/// Whether simulated `day` falls on a Saturday or Sunday.
pub fn is_weekend(day: u32) -> bool {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_days(Days::new(u64::from(day))))
        .is_some_and(|date| matches!(date.weekday(), Weekday::Sat | Weekday::Sun))
}

/// Units sold of one item during a sales pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleLine {
    /// Item name.
    pub name: String,
    /// Units sold.
    pub units: u32,
    /// Revenue from those units.
    pub revenue: Decimal,
}

/// Outcome of one day's customer sales.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SalesReport {
    /// Per-item sales, only for items that sold.
    pub lines: Vec<SaleLine>,
    /// Total units sold.
    pub units_sold: u32,
    /// Total revenue credited to the machine.
    pub revenue: Decimal,
}

impl SalesReport {
    /// Human-readable breakdown, one line per item sold.
    pub fn details(&self) -> String {
        let mut text = String::from("Daily Sales Report:\n");
        for line in &self.lines {
            text.push_str(&format!(
                "- Sold {} units of {} for ${:.2}.\n",
                line.units, line.name, line.revenue
            ));
        }
        text
    }
}

/// The customer demand model.
#[derive(Debug, Clone, PartialEq)]
pub struct EconomicModel {
    weekend_multiplier: f64,
    noise_min: f64,
    noise_max: f64,
}

impl Default for EconomicModel {
    fn default() -> Self {
        Self {
            weekend_multiplier: WEEKEND_MULTIPLIER,
            noise_min: NOISE_MIN,
            noise_max: NOISE_MAX,
        }
    }
}

impl EconomicModel {
    /// Create the model with the standard multipliers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Demand for `item` on `day` with a fixed `noise` factor.
    ///
    /// Ignores stock on hand; zero when the price or reference price is
    /// not positive.
    pub fn expected_demand(&self, item: &Item, day: u32, noise: f64) -> u32 {
        let profile = &item.demand;
        if item.price <= Decimal::ZERO || profile.reference_price <= Decimal::ZERO {
            return 0;
        }
        let (Some(price), Some(reference)) =
            (item.price.to_f64(), profile.reference_price.to_f64())
        else {
            return 0;
        };
        let price_effect = (price / reference).powf(profile.elasticity);
        let day_multiplier = if is_weekend(day) {
            self.weekend_multiplier
        } else {
            1.0
        };
        let raw = f64::from(profile.base_sales) * price_effect * day_multiplier * noise;
        round_units(raw)
    }

    /// Demand for `item` on `day` with noise drawn from `rng`.
    pub fn sample_demand<R: Rng + ?Sized>(&self, item: &Item, day: u32, rng: &mut R) -> u32 {
        let noise = rng.random_range(self.noise_min..=self.noise_max);
        self.expected_demand(item, day, noise)
    }

    /// Run one day of customer sales against the vending machine.
    ///
    /// Sold units leave the machine, revenue goes into the machine's cash
    /// box, and items that sell out stay in the inventory at zero.
    pub fn run_sales_pass<R: Rng + ?Sized>(
        &self,
        machine: &mut Inventory,
        day: u32,
        rng: &mut R,
    ) -> SalesReport {
        let mut report = SalesReport::default();
        for item in machine.items_mut() {
            if item.quantity == 0 || item.price <= Decimal::ZERO {
                continue;
            }
            let demand = self.sample_demand(item, day, rng);
            let units = demand.min(item.quantity);
            if units == 0 {
                continue;
            }
            item.quantity = item.quantity.saturating_sub(units);
            let revenue = item.price.saturating_mul(Decimal::from(units));
            debug!(item = %item.name, demand, units, %revenue, "customer sales");
            report.units_sold = report.units_sold.saturating_add(units);
            report.revenue = report.revenue.saturating_add(revenue);
            report.lines.push(SaleLine {
                name: item.name.clone(),
                units,
                revenue,
            });
        }
        machine.add_cash(report.revenue);
        report
    }
}

/// Round a non-negative demand figure to whole units.
fn round_units(raw: f64) -> u32 {
    if !raw.is_finite() || raw <= 0.0 {
        return 0;
    }
    let clamped = raw.round().min(f64::from(u32::MAX));
    // Clamped to [0, u32::MAX] above.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let units = clamped as u32;
    units
}
