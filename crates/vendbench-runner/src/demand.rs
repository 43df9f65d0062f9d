//! Initial demand parameters, generated once per item by the language model.
//!
//! Each field falls back independently: a response that parses but carries
//! a positive elasticity keeps its reference price and base sales. A
//! response that is not JSON at all yields the whole fallback profile.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use vendbench_types::{DemandProfile, Inventory};

use crate::llm::LlmBackend;
use crate::parse::parse_json_object;
use crate::prompt::{PromptEngine, PromptKind};

#[derive(Debug, Serialize)]
struct DemandContext<'a> {
    item: &'a str,
}

/// Ask the model for the demand profile of `item`, currently priced at `price`.
pub async fn seed_demand_profile(
    backend: &LlmBackend,
    prompts: &PromptEngine,
    item: &str,
    price: Decimal,
) -> DemandProfile {
    let prompt = match prompts.render(PromptKind::Demand, &DemandContext { item }) {
        Ok(prompt) => prompt,
        Err(e) => {
            warn!(item, error = %e, "Could not render demand prompt, using defaults");
            return DemandProfile::fallback(price);
        }
    };
    let raw = backend.generate(&prompt).await;
    match parse_json_object(&raw) {
        Ok(json) => {
            let profile = profile_from_json(&json, price);
            info!(
                item,
                elasticity = profile.elasticity,
                reference_price = %profile.reference_price,
                base_sales = profile.base_sales,
                "Demand profile set"
            );
            profile
        }
        Err(e) => {
            warn!(item, error = %e, "Failed to parse demand profile, using defaults");
            DemandProfile::fallback(price)
        }
    }
}

/// Seed every item in `inventory`, in name order. Returns the number seeded.
pub async fn seed_demand_profiles(backend: &LlmBackend, prompts: &PromptEngine, inventory: &mut Inventory) -> usize {
    let mut seeded = 0_usize;
    for item in inventory.items_mut() {
        item.demand = seed_demand_profile(backend, prompts, &item.name, item.price).await;
        seeded = seeded.saturating_add(1);
    }
    seeded
}

fn profile_from_json(json: &Value, price: Decimal) -> DemandProfile {
    let fallback = DemandProfile::fallback(price);

    let elasticity = json
        .get("elasticity")
        .and_then(number)
        .filter(|e| e.is_finite() && *e < 0.0)
        .unwrap_or(fallback.elasticity);
    let reference_price = json
        .get("reference_price")
        .and_then(number)
        .and_then(Decimal::from_f64)
        .map(|p| p.round_dp(2))
        .filter(|p| p.is_sign_positive() && !p.is_zero())
        .unwrap_or(fallback.reference_price);
    let base_sales = json
        .get("base_sales")
        .and_then(number)
        .filter(|s| s.is_finite() && *s >= 0.0)
        .and_then(|s| u32::from_f64(s.round()))
        .unwrap_or(fallback.base_sales);

    DemandProfile {
        elasticity,
        reference_price,
        base_sales,
    }
}

/// A JSON number, or a string holding one.
fn number(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}
