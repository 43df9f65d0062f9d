//! Supplier ordering.
//!
//! An order is all-or-nothing: either every line validates, the total cost
//! fits in the cash balance, and a delivery is scheduled, or the state is
//! left untouched and an [`OrderError`] explains why.
//!
//! Orders are subject to the supplier's unreliability:
//!
//! - the supplier may be unreachable (no order at all),
//! - each line's unit cost fluctuates around the catalog wholesale cost,
//! - a line may ship only part of the requested quantity,
//! - arrival is a random number of days after the order day.

use std::collections::BTreeMap;

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use tracing::{info, warn};
use vendbench_types::WorldState;

use crate::error::OrderError;
use crate::validation::{validate_item_name, validate_quantity};

/// Knobs controlling supplier behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierPolicy {
    /// Probability that the whole order fails to reach the supplier.
    pub failure_chance: f64,
    /// Maximum relative deviation of unit cost from the catalog cost.
    pub price_jitter: f64,
    /// Probability that a line ships only partially.
    pub partial_chance: f64,
    /// Smallest fraction of a line shipped when partial.
    pub partial_min: f64,
    /// Largest fraction of a line shipped when partial.
    pub partial_max: f64,
    /// Shortest lead time in days.
    pub min_lead_days: u32,
    /// Longest lead time in days.
    pub max_lead_days: u32,
    /// Largest quantity accepted on one line.
    pub max_quantity: u32,
}

impl Default for SupplierPolicy {
    fn default() -> Self {
        Self {
            failure_chance: 0.05,
            price_jitter: 0.05,
            partial_chance: 0.15,
            partial_min: 0.6,
            partial_max: 0.9,
            min_lead_days: 2,
            max_lead_days: 5,
            max_quantity: 10_000,
        }
    }
}

/// One requested line of an order, as received from the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    /// Catalog item name.
    pub name: String,
    /// Requested units; validated before use.
    pub quantity: i64,
}

/// A line the supplier shipped short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortShipment {
    /// Item name.
    pub name: String,
    /// Units requested.
    pub requested: u32,
    /// Units actually shipped.
    pub shipped: u32,
}

/// An accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    /// Amount deducted from the cash balance.
    pub total_cost: Decimal,
    /// Day the delivery becomes available.
    pub arrival_day: u32,
    /// Units shipped per item.
    pub items: BTreeMap<String, u32>,
    /// Lines shipped short.
    pub short: Vec<ShortShipment>,
}

impl OrderConfirmation {
    /// Result text shown to the decision agent.
    pub fn summary(&self) -> String {
        let items: Vec<String> = self
            .items
            .iter()
            .map(|(name, quantity)| format!("{name} x {quantity}"))
            .collect();
        let mut text = format!(
            "Successfully purchased items for ${:.2}. They will be delivered to your storage on Day {}. Items ordered: {}.",
            self.total_cost,
            self.arrival_day,
            items.join(", ")
        );
        for short in &self.short {
            text.push_str(&format!(
                " Partial shipment: only {} of {} {} could be supplied.",
                short.shipped, short.requested, short.name
            ));
        }
        text
    }
}

struct PricedLine {
    name: String,
    requested: u32,
    shipped: u32,
    unit_cost: Decimal,
}

/// Place an order against the catalog and the current cash balance.
///
/// On success the cost is deducted and the shipped quantities are
/// scheduled for arrival. On any error nothing changes.
pub fn place_order<R: Rng + ?Sized>(
    state: &mut WorldState,
    lines: &[OrderLine],
    policy: &SupplierPolicy,
    rng: &mut R,
) -> Result<OrderConfirmation, OrderError> {
    if roll(rng, policy.failure_chance) {
        warn!(day = state.day, "Supplier unreachable, order dropped");
        return Err(OrderError::CommunicationFailed);
    }

    let mut problems = Vec::new();
    let mut priced = Vec::new();
    for line in lines {
        let requested = match validate_item_name(&line.name)
            .and_then(|_| validate_quantity(line.quantity, policy.max_quantity))
        {
            Ok(q) => q,
            Err(e) => {
                problems.push(format!("Invalid order item '{}': {e}", line.name));
                continue;
            }
        };
        let Some(entry) = state.catalog().get(&line.name) else {
            problems.push(format!(
                "Item '{}' is not a valid item and cannot be ordered.",
                line.name
            ));
            continue;
        };

        let jitter = policy.price_jitter.abs();
        let multiplier = 1.0 + (rng.random::<f64>() * 2.0 - 1.0) * jitter;
        let unit_cost = entry
            .wholesale_cost
            .saturating_mul(Decimal::from_f64(multiplier).unwrap_or(Decimal::ONE))
            .round_dp(4);

        let shipped = if requested > 0 && roll(rng, policy.partial_chance) {
            let fraction = policy.partial_min
                + (policy.partial_max - policy.partial_min) * rng.random::<f64>();
            scale_units(requested, fraction)
        } else {
            requested
        };
        if shipped == 0 {
            continue;
        }
        priced.push(PricedLine {
            name: line.name.clone(),
            requested,
            shipped,
            unit_cost,
        });
    }

    if !problems.is_empty() {
        return Err(OrderError::InvalidLines { problems });
    }
    if priced.is_empty() {
        return Err(OrderError::NothingOrdered);
    }

    let total_cost = priced
        .iter()
        .fold(Decimal::ZERO, |acc, line| {
            acc.saturating_add(line.unit_cost.saturating_mul(Decimal::from(line.shipped)))
        })
        .round_dp(2);
    if total_cost > state.cash_balance {
        return Err(OrderError::InsufficientFunds {
            cost: total_cost,
            available: state.cash_balance,
        });
    }

    let (low, high) = if policy.min_lead_days <= policy.max_lead_days {
        (policy.min_lead_days, policy.max_lead_days)
    } else {
        (policy.max_lead_days, policy.min_lead_days)
    };
    let arrival_day = state.day.saturating_add(rng.random_range(low..=high));

    let mut items = BTreeMap::new();
    let mut short = Vec::new();
    for line in priced {
        if line.shipped < line.requested {
            short.push(ShortShipment {
                name: line.name.clone(),
                requested: line.requested,
                shipped: line.shipped,
            });
        }
        let slot = items.entry(line.name).or_insert(0_u32);
        *slot = slot.saturating_add(line.shipped);
    }

    state
        .schedule_delivery(arrival_day, &items)
        .map_err(|e| OrderError::InvalidLines {
            problems: vec![e.to_string()],
        })?;
    state.cash_balance = state.cash_balance.saturating_sub(total_cost);

    info!(
        day = state.day,
        arrival_day,
        total_cost = %total_cost,
        lines = items.len(),
        "Supplier order placed"
    );
    Ok(OrderConfirmation {
        total_cost,
        arrival_day,
        items,
        short,
    })
}

/// Bernoulli trial that tolerates probabilities outside `[0, 1]`.
fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    probability > 0.0 && rng.random::<f64>() < probability
}

/// Scale a quantity by a fraction in `[0, 1]`, rounding down.
fn scale_units(quantity: u32, fraction: f64) -> u32 {
    let scaled = (f64::from(quantity) * fraction.clamp(0.0, 1.0)).floor();
    // Bounded by `quantity` after the clamp.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let units = scaled as u32;
    units
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rust_decimal_macros::dec;

    use super::*;

    fn reliable() -> SupplierPolicy {
        SupplierPolicy {
            failure_chance: 0.0,
            price_jitter: 0.0,
            partial_chance: 0.0,
            ..SupplierPolicy::default()
        }
    }

    fn line(name: &str, quantity: i64) -> OrderLine {
        OrderLine {
            name: name.to_owned(),
            quantity,
        }
    }

    fn state(cash: Decimal) -> WorldState {
        WorldState::with_standard_catalog(cash, dec!(2))
    }

    #[test]
    fn accepted_order_deducts_cash_and_schedules_delivery() {
        let mut state = state(dec!(100));
        let mut rng = SmallRng::seed_from_u64(42);
        let confirmation = place_order(&mut state, &[line("Chips", 100)], &reliable(), &mut rng);
        let Ok(confirmation) = confirmation else {
            panic!("order should succeed");
        };
        assert_eq!(confirmation.total_cost, dec!(30.00));
        assert_eq!(state.cash_balance, dec!(70.00));
        assert!((3..=6).contains(&confirmation.arrival_day));
        let due = state
            .pending_deliveries()
            .get(&confirmation.arrival_day)
            .and_then(|m| m.get("Chips"));
        assert_eq!(due, Some(&100));
        assert!(confirmation.summary().starts_with("Successfully purchased items for $30.00."));
    }

    #[test]
    fn unaffordable_order_changes_nothing() {
        let mut state = state(dec!(10));
        let mut rng = SmallRng::seed_from_u64(42);
        let result = place_order(&mut state, &[line("Soda", 100)], &reliable(), &mut rng);
        assert_eq!(
            result.err().map(|e| e.to_string()).as_deref(),
            Some("Purchase failed. Order cost is $50.00, but you only have $10.00.")
        );
        assert_eq!(state.cash_balance, dec!(10));
        assert!(state.pending_deliveries().is_empty());
    }

    #[test]
    fn unknown_item_rejects_whole_order() {
        let mut state = state(dec!(100));
        let mut rng = SmallRng::seed_from_u64(42);
        let result = place_order(
            &mut state,
            &[line("Chips", 10), line("Caviar", 1)],
            &reliable(),
            &mut rng,
        );
        assert!(matches!(result, Err(OrderError::InvalidLines { .. })));
        assert_eq!(state.cash_balance, dec!(100));
        assert!(state.pending_deliveries().is_empty());
    }

    #[test]
    fn invalid_quantity_is_reported() {
        let mut state = state(dec!(100));
        let mut rng = SmallRng::seed_from_u64(42);
        let result = place_order(&mut state, &[line("Chips", -5)], &reliable(), &mut rng);
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("Quantity cannot be negative"));
    }

    #[test]
    fn zero_quantities_order_nothing() {
        let mut state = state(dec!(100));
        let mut rng = SmallRng::seed_from_u64(42);
        let result = place_order(&mut state, &[line("Chips", 0)], &reliable(), &mut rng);
        assert_eq!(result, Err(OrderError::NothingOrdered));
    }

    #[test]
    fn unreachable_supplier_changes_nothing() {
        let mut state = state(dec!(100));
        let mut rng = SmallRng::seed_from_u64(42);
        let policy = SupplierPolicy {
            failure_chance: 1.0,
            ..reliable()
        };
        let result = place_order(&mut state, &[line("Chips", 10)], &policy, &mut rng);
        assert_eq!(result, Err(OrderError::CommunicationFailed));
        assert_eq!(state.cash_balance, dec!(100));
    }

    #[test]
    fn partial_shipments_stay_within_bounds() {
        let policy = SupplierPolicy {
            partial_chance: 1.0,
            ..reliable()
        };
        let mut rng = SmallRng::seed_from_u64(9);
        for _ in 0..20 {
            let mut state = state(dec!(1000));
            let Ok(confirmation) = place_order(&mut state, &[line("Candy", 100)], &policy, &mut rng)
            else {
                panic!("order should succeed");
            };
            let shipped = confirmation.items.get("Candy").copied().unwrap_or(0);
            assert!((60..=90).contains(&shipped));
            assert_eq!(confirmation.short.len(), 1);
        }
    }

    #[test]
    fn price_fluctuation_stays_within_five_percent() {
        let policy = SupplierPolicy {
            price_jitter: 0.05,
            ..reliable()
        };
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..20 {
            let mut state = state(dec!(1000));
            let Ok(confirmation) = place_order(&mut state, &[line("Soda", 100)], &policy, &mut rng)
            else {
                panic!("order should succeed");
            };
            assert!(confirmation.total_cost >= dec!(47.50));
            assert!(confirmation.total_cost <= dec!(52.50));
        }
    }
}
