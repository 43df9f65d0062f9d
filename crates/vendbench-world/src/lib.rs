//! Customer demand, day rollover, deliveries, and supplier orders for the
//! vending benchmark.
//!
//! Everything in this crate is a synchronous transformation of a
//! [`WorldState`]; randomness is always injected by the caller so runs can
//! be replayed from a seed.
//!
//! # Modules
//!
//! - [`economy`] -- [`EconomicModel`]: price-elastic, weekday-aware demand
//!   and the point-of-sale sales pass.
//! - [`day`] -- Closing a day: sales pass, then the daily fee.
//! - [`delivery`] -- Fulfilling in-transit supplier orders into storage.
//! - [`supplier`] -- Placing supplier orders with failure, price
//!   fluctuation, partial shipments, and lead time.
//! - [`validation`] -- Shared validation for names, prices, quantities, and
//!   email addresses.
//! - [`snapshot`] -- Isolated copies of the world state for readers.
//!
//! [`WorldState`]: vendbench_types::WorldState

pub mod day;
pub mod delivery;
pub mod economy;
pub mod error;
pub mod snapshot;
pub mod supplier;
pub mod validation;

pub use day::{DayReport, close_day};
pub use delivery::{DeliveryReport, fulfill_due_deliveries};
pub use economy::{EconomicModel, SaleLine, SalesReport, is_weekend};
pub use error::{OrderError, ValidationError};
pub use snapshot::snapshot;
pub use supplier::{OrderConfirmation, OrderLine, SupplierPolicy, place_order};
