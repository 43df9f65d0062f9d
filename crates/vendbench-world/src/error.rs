//! Error types for validation and supplier ordering.
//!
//! Display strings are written for the decision agent: tool handlers
//! surface them verbatim after an `Error: ` prefix.

use rust_decimal::Decimal;

/// A rejected input value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Item name missing or blank.
    #[error("Item name cannot be null or empty")]
    EmptyName,

    /// Item name longer than the allowed maximum.
    #[error("Item name cannot exceed {max} characters")]
    NameTooLong {
        /// Maximum permitted length.
        max: usize,
    },

    /// Price missing or not a finite number.
    #[error("Price must be a valid number")]
    InvalidPrice,

    /// Price outside the configured range.
    #[error("Price {price:.2} is not within valid range ({min:.2} - {max:.2})")]
    PriceOutOfRange {
        /// The rejected price.
        price: Decimal,
        /// Lowest allowed price.
        min: Decimal,
        /// Highest allowed price.
        max: Decimal,
    },

    /// Quantity below zero.
    #[error("Quantity cannot be negative")]
    NegativeQuantity,

    /// Quantity above the configured maximum.
    #[error("Quantity cannot exceed {max} units")]
    QuantityTooLarge {
        /// Maximum permitted quantity.
        max: u32,
    },

    /// Email address missing or blank.
    #[error("Email address cannot be null or empty")]
    EmptyEmail,

    /// Email address without `@` or `.`.
    #[error("Email address must be in valid format")]
    MalformedEmail,
}

/// Reasons a supplier order is refused. No state changes on any of them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The supplier could not be reached this time.
    #[error("Supplier communication failed. Could not reach the supplier. Please try again later.")]
    CommunicationFailed,

    /// One or more order lines were invalid.
    #[error("Purchase failed due to invalid items.\n{}", problems.join("\n"))]
    InvalidLines {
        /// One description per rejected line.
        problems: Vec<String>,
    },

    /// Every line had a zero quantity.
    #[error("No valid items were specified for purchase.")]
    NothingOrdered,

    /// The order costs more than the available cash.
    #[error("Purchase failed. Order cost is ${cost:.2}, but you only have ${available:.2}.")]
    InsufficientFunds {
        /// Total order cost.
        cost: Decimal,
        /// Cash balance at the time of the order.
        available: Decimal,
    },
}
