//! The immutable product catalog.
//!
//! Purchasing and delivery validate item names against the catalog. Unlike
//! the inventories, which may be emptied, the catalog always knows every
//! product the simulation can carry.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

/// Reference pricing for one catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    /// Suggested retail price; also the seed sale price.
    pub reference_price: Decimal,
    /// Base wholesale cost before supplier price fluctuation.
    pub wholesale_cost: Decimal,
}

/// Read-only map of product name to [`CatalogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProductCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl ProductCatalog {
    /// Build a catalog from `(name, entry)` pairs.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, CatalogEntry)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, entry)| (name.into(), entry))
                .collect(),
        }
    }

    /// The three seed products: Chips, Candy, and Soda.
    pub fn standard() -> Self {
        Self::new([
            (
                "Chips",
                CatalogEntry {
                    reference_price: Decimal::new(175, 2),
                    wholesale_cost: Decimal::new(30, 2),
                },
            ),
            (
                "Candy",
                CatalogEntry {
                    reference_price: Decimal::new(125, 2),
                    wholesale_cost: Decimal::new(25, 2),
                },
            ),
            (
                "Soda",
                CatalogEntry {
                    reference_price: Decimal::new(200, 2),
                    wholesale_cost: Decimal::new(50, 2),
                },
            ),
        ])
    }

    /// Look up a product.
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(name)
    }

    /// Whether `name` is a catalog product.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterate over all products in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn standard_catalog_has_three_products() {
        let catalog = ProductCatalog::standard();
        assert_eq!(catalog.len(), 3);
        assert_eq!(
            catalog.get("Soda").map(|e| e.wholesale_cost),
            Some(dec!(0.50))
        );
        assert!(!catalog.contains("Gum"));
    }

    #[test]
    fn serializes_as_plain_map() {
        let json = serde_json::to_value(ProductCatalog::standard()).unwrap_or_default();
        assert!(json.get("Chips").is_some());
    }
}
