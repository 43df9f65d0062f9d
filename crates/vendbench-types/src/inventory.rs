//! Storage and point-of-sale inventories.
//!
//! Quantities never go negative: removing more than is on hand clamps to
//! zero. Items that reach zero stay in the map so they remain known SKUs.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::item::Item;

/// A named collection of items plus the cash collected at this location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: BTreeMap<String, Item>,
    cash_held: Decimal,
}

impl Inventory {
    /// Create an empty inventory with no cash.
    pub fn new() -> Self {
        Self::default()
    }

    /// All items keyed by name.
    pub const fn items(&self) -> &BTreeMap<String, Item> {
        &self.items
    }

    /// Look up an item by name.
    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    /// Look up an item by name for mutation.
    pub fn item_mut(&mut self, name: &str) -> Option<&mut Item> {
        self.items.get_mut(name)
    }

    /// Iterate over items mutably.
    pub fn items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.items.values_mut()
    }

    /// Units on hand of `name`, zero if unknown.
    pub fn quantity_of(&self, name: &str) -> u32 {
        self.items.get(name).map_or(0, |item| item.quantity)
    }

    /// Add `quantity` units of `name`.
    ///
    /// An existing entry keeps its price, cost, and demand profile; a new
    /// entry is created with the given price and cost.
    pub fn add_stock(&mut self, name: &str, quantity: u32, price: Decimal, wholesale_cost: Decimal) {
        match self.items.get_mut(name) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => {
                self.items
                    .insert(name.to_owned(), Item::new(name, quantity, price, wholesale_cost));
            }
        }
    }

    /// Merge a whole item into this inventory.
    ///
    /// If an entry with the same name exists only its quantity grows.
    pub fn insert_item(&mut self, item: Item) {
        match self.items.get_mut(&item.name) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => {
                self.items.insert(item.name.clone(), item);
            }
        }
    }

    /// Remove up to `quantity` units of `name`, returning how many were removed.
    pub fn remove_stock(&mut self, name: &str, quantity: u32) -> u32 {
        let Some(item) = self.items.get_mut(name) else {
            return 0;
        };
        let removed = quantity.min(item.quantity);
        item.quantity = item.quantity.saturating_sub(removed);
        removed
    }

    /// Total units across all items.
    pub fn total_units(&self) -> u64 {
        self.items
            .values()
            .fold(0_u64, |acc, item| acc.saturating_add(u64::from(item.quantity)))
    }

    /// Wholesale value of everything on hand.
    pub fn stock_value(&self) -> Decimal {
        self.items
            .values()
            .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.stock_value()))
    }

    /// Cash waiting to be collected.
    pub const fn cash_held(&self) -> Decimal {
        self.cash_held
    }

    /// Credit revenue to this inventory's cash box.
    pub fn add_cash(&mut self, amount: Decimal) {
        self.cash_held = self.cash_held.saturating_add(amount);
    }

    /// Empty the cash box, returning what it held.
    pub fn take_cash(&mut self) -> Decimal {
        core::mem::take(&mut self.cash_held)
    }
}
