//! Fulfilling in-transit supplier orders.

use tracing::{error, info};
use vendbench_types::WorldState;

/// Result of one fulfillment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Items added to storage with their quantities.
    pub received: Vec<(String, u32)>,
    /// Items that could not be matched to the catalog.
    pub rejected: Vec<(String, u32)>,
}

impl DeliveryReport {
    /// Whether nothing arrived.
    pub fn is_empty(&self) -> bool {
        self.received.is_empty() && self.rejected.is_empty()
    }

    /// `Delivery arrived: 10 units of Chips, 5 units of Soda.`, if anything arrived.
    pub fn summary(&self) -> Option<String> {
        if self.received.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .received
            .iter()
            .map(|(name, quantity)| format!("{quantity} units of {name}"))
            .collect();
        Some(format!("Delivery arrived: {}.", parts.join(", ")))
    }
}

/// Move every delivery due on or before the current day into storage.
///
/// Each pending delivery is consumed exactly once. Quantities land in
/// storage priced from the catalog.
pub fn fulfill_due_deliveries(state: &mut WorldState) -> DeliveryReport {
    let mut report = DeliveryReport::default();
    for (name, quantity) in state.take_due_deliveries() {
        match state.receive_into_storage(&name, quantity) {
            Ok(()) => report.received.push((name, quantity)),
            Err(e) => {
                error!(item = %name, quantity, error = %e, "Cannot deliver unknown item");
                report.rejected.push((name, quantity));
            }
        }
    }
    if let Some(summary) = report.summary() {
        info!(day = state.day, "{summary}");
    }
    report
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn delivery_arrives_on_its_day_exactly_once() {
        let mut state = WorldState::with_standard_catalog(dec!(100), dec!(2));
        let order = BTreeMap::from([(String::from("Chips"), 20_u32), (String::from("Soda"), 5)]);
        assert!(state.schedule_delivery(3, &order).is_ok());

        state.day = 2;
        assert!(fulfill_due_deliveries(&mut state).is_empty());
        assert_eq!(state.storage.quantity_of("Chips"), 50);

        state.day = 3;
        let report = fulfill_due_deliveries(&mut state);
        assert_eq!(
            report.summary().as_deref(),
            Some("Delivery arrived: 20 units of Chips, 5 units of Soda.")
        );
        assert_eq!(state.storage.quantity_of("Chips"), 70);
        assert_eq!(state.storage.quantity_of("Soda"), 55);

        state.day = 4;
        assert!(fulfill_due_deliveries(&mut state).is_empty());
        assert_eq!(state.storage.quantity_of("Chips"), 70);
    }

    #[test]
    fn late_observation_still_delivers() {
        let mut state = WorldState::with_standard_catalog(dec!(100), dec!(2));
        let order = BTreeMap::from([(String::from("Candy"), 8_u32)]);
        assert!(state.schedule_delivery(3, &order).is_ok());
        state.day = 6;
        let report = fulfill_due_deliveries(&mut state);
        assert_eq!(report.received, vec![(String::from("Candy"), 8)]);
    }
}
