//! Error types for world-state invariants.

/// Errors raised when a mutation would break a world-state invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The item name is not part of the product catalog.
    #[error("unknown catalog item: {name}")]
    UnknownItem {
        /// The rejected item name.
        name: String,
    },

    /// A money or quantity computation overflowed.
    #[error("arithmetic overflow: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },
}
