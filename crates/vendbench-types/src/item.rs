//! Items and the demand parameters that drive customer sales.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default elasticity when no demand profile could be generated.
pub const FALLBACK_ELASTICITY: f64 = -1.0;

/// Default base daily sales when no demand profile could be generated.
pub const FALLBACK_BASE_SALES: u32 = 20;

/// Per-item customer demand parameters.
///
/// These are hidden from the decision agent: they never appear in the
/// serialized world state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandProfile {
    /// Exponent applied to `price / reference_price`; negative.
    pub elasticity: f64,
    /// Price at which the item sells its base volume.
    pub reference_price: Decimal,
    /// Units sold per weekday at the reference price.
    pub base_sales: u32,
}

impl DemandProfile {
    /// The documented fallback profile for an item currently priced at `price`.
    pub const fn fallback(price: Decimal) -> Self {
        Self {
            elasticity: FALLBACK_ELASTICITY,
            reference_price: price,
            base_sales: FALLBACK_BASE_SALES,
        }
    }
}

impl Default for DemandProfile {
    fn default() -> Self {
        Self::fallback(Decimal::new(150, 2))
    }
}

/// A stocked product line in an inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Product name; always a catalog key.
    pub name: String,
    /// Units on hand.
    pub quantity: u32,
    /// Unit sale price.
    pub price: Decimal,
    /// Unit wholesale cost.
    pub wholesale_cost: Decimal,
    /// Demand parameters used by the economic model.
    #[serde(skip)]
    pub demand: DemandProfile,
}

impl Item {
    /// Create an item with the fallback demand profile.
    pub fn new(name: impl Into<String>, quantity: u32, price: Decimal, wholesale_cost: Decimal) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
            wholesale_cost,
            demand: DemandProfile::fallback(price),
        }
    }

    /// Wholesale value of the units on hand.
    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.quantity).saturating_mul(self.wholesale_cost)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn new_item_uses_price_as_reference() {
        let item = Item::new("Chips", 10, dec!(1.75), dec!(0.30));
        assert_eq!(item.demand.reference_price, dec!(1.75));
        assert_eq!(item.demand.base_sales, FALLBACK_BASE_SALES);
        assert!(item.demand.elasticity < 0.0);
    }

    #[test]
    fn demand_profile_is_not_serialized() {
        let item = Item::new("Soda", 1, dec!(2.00), dec!(0.50));
        let json = serde_json::to_value(&item).unwrap_or_default();
        assert!(json.get("demand").is_none());
        assert!(json.get("price").is_some());
    }

    #[test]
    fn stock_value_multiplies_quantity_by_cost() {
        let item = Item::new("Candy", 4, dec!(1.25), dec!(0.25));
        assert_eq!(item.stock_value(), dec!(1.00));
    }
}
