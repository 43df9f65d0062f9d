//! The mutable world state driven by the orchestrator.
//!
//! A [`WorldState`] is created once per run, mutated only by the turn loop
//! and the tool handlers it invokes, and replaced wholesale on reset.
//! External readers never borrow it; they receive clones.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::ProductCatalog;
use crate::error::TypesError;
use crate::inventory::Inventory;

/// Units of each catalog item seeded into storage at the start of a run.
pub const SEED_QUANTITY: u32 = 50;

/// In-transit orders: arrival day to (item name to quantity).
pub type PendingDeliveries = BTreeMap<u32, BTreeMap<String, u32>>;

/// A message waiting in the agent's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEmail {
    /// Address the message came from.
    pub sender: String,
    /// Message body.
    pub body: String,
}

/// A message the agent sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentEmail {
    /// Destination address.
    pub recipient: String,
    /// Message body.
    pub body: String,
    /// Wall-clock send time.
    pub sent_at: DateTime<Utc>,
}

/// Complete state of one simulated vending business.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldState {
    /// Current turn, starting at 1.
    pub turn: u32,
    /// Current simulated day, starting at 1.
    pub day: u32,
    /// Main cash balance; may go negative through daily fees.
    pub cash_balance: Decimal,
    /// Fee deducted each time a day closes.
    pub daily_fee: Decimal,
    /// Back-room storage.
    pub storage: Inventory,
    /// The vending machine (point of sale).
    #[serde(rename = "vending_machine")]
    pub machine: Inventory,
    /// Unread messages.
    pub inbox: Vec<InboundEmail>,
    /// Every message sent this run.
    pub sent_emails: Vec<SentEmail>,
    /// Units sold since the run began.
    pub total_units_sold: u64,
    #[serde(skip)]
    pending_deliveries: PendingDeliveries,
    #[serde(rename = "product_catalog")]
    catalog: ProductCatalog,
}

impl WorldState {
    /// Create a fresh state with storage seeded from the catalog.
    ///
    /// Every catalog product starts with [`SEED_QUANTITY`] units in storage
    /// at its reference price and wholesale cost.
    pub fn new(initial_cash: Decimal, daily_fee: Decimal, catalog: ProductCatalog) -> Self {
        let mut storage = Inventory::new();
        for (name, entry) in catalog.iter() {
            storage.add_stock(name, SEED_QUANTITY, entry.reference_price, entry.wholesale_cost);
        }
        Self {
            turn: 1,
            day: 1,
            cash_balance: initial_cash,
            daily_fee,
            storage,
            machine: Inventory::new(),
            inbox: Vec::new(),
            sent_emails: Vec::new(),
            total_units_sold: 0,
            pending_deliveries: PendingDeliveries::new(),
            catalog,
        }
    }

    /// Create a fresh state over [`ProductCatalog::standard`].
    pub fn with_standard_catalog(initial_cash: Decimal, daily_fee: Decimal) -> Self {
        Self::new(initial_cash, daily_fee, ProductCatalog::standard())
    }

    /// The immutable product catalog.
    pub const fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// In-transit orders keyed by arrival day.
    pub const fn pending_deliveries(&self) -> &PendingDeliveries {
        &self.pending_deliveries
    }

    /// Move to the next turn.
    pub const fn advance_turn(&mut self) {
        self.turn = self.turn.saturating_add(1);
    }

    /// Move to the next day and deduct the daily fee. Returns the new day.
    pub fn advance_day(&mut self) -> u32 {
        self.day = self.day.saturating_add(1);
        self.cash_balance = self.cash_balance.saturating_sub(self.daily_fee);
        self.day
    }

    /// Schedule `items` to arrive on `arrival_day`.
    ///
    /// Quantities merge with anything already due that day. Every name is
    /// checked against the catalog before anything is recorded.
    pub fn schedule_delivery(
        &mut self,
        arrival_day: u32,
        items: &BTreeMap<String, u32>,
    ) -> Result<(), TypesError> {
        if let Some(unknown) = items.keys().find(|name| !self.catalog.contains(name)) {
            return Err(TypesError::UnknownItem {
                name: unknown.clone(),
            });
        }
        let due = self.pending_deliveries.entry(arrival_day).or_default();
        for (name, quantity) in items {
            let slot = due.entry(name.clone()).or_insert(0);
            *slot = slot.saturating_add(*quantity);
        }
        Ok(())
    }

    /// Remove and return every delivery due on or before the current day.
    ///
    /// Each scheduled delivery is returned exactly once.
    pub fn take_due_deliveries(&mut self) -> BTreeMap<String, u32> {
        let later = self
            .pending_deliveries
            .split_off(&self.day.saturating_add(1));
        let due = core::mem::replace(&mut self.pending_deliveries, later);
        let mut merged = BTreeMap::new();
        for (name, quantity) in due.into_values().flatten() {
            let slot = merged.entry(name).or_insert(0_u32);
            *slot = slot.saturating_add(quantity);
        }
        merged
    }

    /// Add delivered units of a catalog item to storage.
    ///
    /// New storage entries take the catalog's reference price and wholesale
    /// cost; existing entries keep their current price.
    pub fn receive_into_storage(&mut self, name: &str, quantity: u32) -> Result<(), TypesError> {
        let entry = self.catalog.get(name).ok_or_else(|| TypesError::UnknownItem {
            name: name.to_owned(),
        })?;
        self.storage
            .add_stock(name, quantity, entry.reference_price, entry.wholesale_cost);
        Ok(())
    }

    /// Record an outbound email.
    pub fn record_sent_email(&mut self, recipient: &str, body: &str) {
        self.sent_emails.push(SentEmail {
            recipient: recipient.to_owned(),
            body: body.to_owned(),
            sent_at: Utc::now(),
        });
    }

    /// Drop a message into the inbox.
    pub fn deliver_email(&mut self, sender: &str, body: &str) {
        self.inbox.push(InboundEmail {
            sender: sender.to_owned(),
            body: body.to_owned(),
        });
    }

    /// Take every unread message, leaving the inbox empty.
    pub fn drain_inbox(&mut self) -> Vec<InboundEmail> {
        core::mem::take(&mut self.inbox)
    }

    /// Cash, machine cash, and wholesale value of both inventories.
    pub fn net_worth(&self) -> Decimal {
        self.cash_balance
            .saturating_add(self.machine.cash_held())
            .saturating_add(self.storage.stock_value())
            .saturating_add(self.machine.stock_value())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn fresh() -> WorldState {
        WorldState::with_standard_catalog(dec!(500), dec!(2))
    }

    fn order(name: &str, quantity: u32) -> BTreeMap<String, u32> {
        BTreeMap::from([(name.to_owned(), quantity)])
    }

    #[test]
    fn new_state_seeds_storage_from_catalog() {
        let state = fresh();
        assert_eq!(state.turn, 1);
        assert_eq!(state.day, 1);
        assert_eq!(state.storage.quantity_of("Chips"), SEED_QUANTITY);
        assert_eq!(state.storage.quantity_of("Candy"), SEED_QUANTITY);
        assert_eq!(state.storage.quantity_of("Soda"), SEED_QUANTITY);
        assert_eq!(state.machine.total_units(), 0);
    }

    #[test]
    fn advance_day_deducts_fee() {
        let mut state = fresh();
        assert_eq!(state.advance_day(), 2);
        assert_eq!(state.cash_balance, dec!(498));
    }

    #[test]
    fn schedule_rejects_unknown_item_without_recording() {
        let mut state = fresh();
        let result = state.schedule_delivery(4, &order("Gum", 5));
        assert!(matches!(result, Err(TypesError::UnknownItem { .. })));
        assert!(state.pending_deliveries().is_empty());
    }

    #[test]
    fn schedule_merges_same_day_orders() {
        let mut state = fresh();
        assert!(state.schedule_delivery(3, &order("Soda", 5)).is_ok());
        assert!(state.schedule_delivery(3, &order("Soda", 7)).is_ok());
        let due = state.pending_deliveries().get(&3).and_then(|m| m.get("Soda"));
        assert_eq!(due, Some(&12));
    }

    #[test]
    fn due_deliveries_are_taken_once_and_only_when_due() {
        let mut state = fresh();
        assert!(state.schedule_delivery(3, &order("Chips", 10)).is_ok());
        assert!(state.schedule_delivery(5, &order("Candy", 4)).is_ok());

        state.day = 2;
        assert!(state.take_due_deliveries().is_empty());

        state.day = 4;
        let due = state.take_due_deliveries();
        assert_eq!(due.get("Chips"), Some(&10));
        assert!(due.get("Candy").is_none());
        assert!(state.take_due_deliveries().is_empty());
        assert_eq!(state.pending_deliveries().len(), 1);
    }

    #[test]
    fn receive_into_storage_requires_catalog_item() {
        let mut state = fresh();
        assert!(state.receive_into_storage("Chips", 5).is_ok());
        assert_eq!(state.storage.quantity_of("Chips"), 55);
        assert!(state.receive_into_storage("Gum", 5).is_err());
    }

    #[test]
    fn net_worth_counts_cash_and_stock() {
        let mut state = fresh();
        state.machine.add_cash(dec!(10));
        // 500 cash + 10 machine + 50 * (0.30 + 0.25 + 0.50)
        assert_eq!(state.net_worth(), dec!(562.50));
    }

    #[test]
    fn clone_is_independent() {
        let original = fresh();
        let mut copy = original.clone();
        copy.storage.remove_stock("Chips", 50);
        copy.deliver_email("a@b.c", "hi");
        assert_eq!(original.storage.quantity_of("Chips"), SEED_QUANTITY);
        assert!(original.inbox.is_empty());
    }

    #[test]
    fn serialized_state_hides_pending_deliveries() {
        let mut state = fresh();
        assert!(state.schedule_delivery(3, &order("Chips", 1)).is_ok());
        let json = serde_json::to_value(&state).unwrap_or_default();
        assert!(json.get("pending_deliveries").is_none());
        assert!(json.get("vending_machine").is_some());
        assert!(json.get("product_catalog").is_some());
    }
}
