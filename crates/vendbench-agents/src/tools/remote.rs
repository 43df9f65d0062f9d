//! Tools reaching outside the machine: bank balance, web, supplier, email.

use serde_json::Value;
use vendbench_world::validation::validate_email;
use vendbench_world::{OrderLine, SupplierPolicy, place_order};

use super::{ToolContext, ToolHandler, array_param, integer_value, str_param};
use crate::error::ToolError;

/// Canned answers keyed by a phrase the query must contain.
const SEARCH_RESULTS: &[(&str, &str)] = &[
    (
        "best snacks for vending machine",
        "Search Result: Market research shows that classic potato chips, chocolate bars, and popular sodas are top-sellers.",
    ),
    (
        "vending machine suppliers",
        "Search Result: 'Global Snacks Co.' (supplier@globalsnacks.com) and 'Beverage World Inc.' are top-rated bulk suppliers for vending businesses.",
    ),
    (
        "vending machine maintenance",
        "Search Result: Common issues include coin jams and malfunctioning bill validators. For service, contact a professional like 'Vending Tech' (maintenance@vendingtech.com).",
    ),
    (
        "how to increase vending machine sales",
        "Search Result: Strategies include optimizing product placement, offering promotions, ensuring the machine is always stocked, and accepting cashless payments.",
    ),
];

/// `get_money_balance`: report the main cash balance.
#[derive(Debug, Clone, Copy)]
pub struct GetMoneyBalance;

impl ToolHandler for GetMoneyBalance {
    fn execute(&self, _params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        Ok(format!(
            "Your current main cash balance is: ${:.2}",
            ctx.state.cash_balance
        ))
    }
}

/// `internet_search {query}`: answer from a fixed table of market research.
#[derive(Debug, Clone, Copy)]
pub struct InternetSearch;

impl ToolHandler for InternetSearch {
    fn execute(&self, params: &Value, _ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let raw = str_param(params, "query");
        let query = raw.to_lowercase();
        if query.trim().is_empty() {
            return Err(ToolError::missing("Search query cannot be empty."));
        }
        let hit = SEARCH_RESULTS
            .iter()
            .find(|(phrase, _)| query.contains(phrase))
            .map(|(_, answer)| (*answer).to_owned());
        Ok(hit.unwrap_or_else(|| {
            format!("Search Result: No relevant information found for query: '{raw}'")
        }))
    }
}

/// `purchase_from_supplier {items: [{name, quantity}]}`.
#[derive(Debug, Clone)]
pub struct PurchaseFromSupplier {
    policy: SupplierPolicy,
}

impl PurchaseFromSupplier {
    /// Create the tool around a supplier policy.
    pub const fn new(policy: SupplierPolicy) -> Self {
        Self { policy }
    }
}

impl ToolHandler for PurchaseFromSupplier {
    fn execute(&self, params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let lines: Vec<OrderLine> = array_param(params, "items")
            .ok_or_else(|| {
                ToolError::missing(
                    "You must provide a list of 'items' with 'name' and 'quantity' to purchase.",
                )
            })?
            .iter()
            .map(|line| OrderLine {
                name: line
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_owned(),
                quantity: integer_value(line.get("quantity")).unwrap_or(0),
            })
            .collect();

        let confirmation = place_order(&mut *ctx.state, &lines, &self.policy, &mut *ctx.rng)?;
        Ok(confirmation.summary())
    }
}

/// `read_email`: show and consume the inbox.
#[derive(Debug, Clone, Copy)]
pub struct ReadEmail;

impl ToolHandler for ReadEmail {
    fn execute(&self, _params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let emails = ctx.state.drain_inbox();
        if emails.is_empty() {
            return Ok(String::from("Your email inbox is empty."));
        }
        let rendered: Vec<String> = emails
            .iter()
            .zip(1_usize..)
            .map(|(email, n)| format!("--- EMAIL {n} ---\nFrom: {}\nBody: {}\n", email.sender, email.body))
            .collect();
        Ok(format!(
            "You have read all emails from your inbox. The content was:\n\n{}",
            rendered.join("\n")
        ))
    }
}

/// `send_email {recipient, body}`: record an outbound message.
///
/// The reply is produced by the turn loop after the tool returns.
#[derive(Debug, Clone, Copy)]
pub struct SendEmail;

impl ToolHandler for SendEmail {
    fn execute(&self, params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let recipient = str_param(params, "recipient").trim();
        let body = str_param(params, "body");
        if recipient.is_empty() || body.trim().is_empty() {
            return Err(ToolError::missing("Email recipient and body cannot be empty."));
        }
        validate_email(recipient)?;
        ctx.state.record_sent_email(recipient, body);
        Ok(format!(
            "Email sent to {recipient}. A reply may arrive in your inbox later."
        ))
    }
}

/// `view_email_history`: list sent mail and the unread inbox.
#[derive(Debug, Clone, Copy)]
pub struct ViewEmailHistory;

impl ToolHandler for ViewEmailHistory {
    fn execute(&self, _params: &Value, ctx: &mut ToolContext<'_>) -> Result<String, ToolError> {
        let mut report = String::from("Email History:\n\n=== SENT EMAILS ===\n");
        if ctx.state.sent_emails.is_empty() {
            report.push_str("No emails have been sent.\n");
        }
        for email in &ctx.state.sent_emails {
            report.push_str(&format!("To: {}\nBody: {}\n---\n", email.recipient, email.body));
        }

        report.push_str("\n=== INBOX ===\n");
        if ctx.state.inbox.is_empty() {
            report.push_str("The inbox is empty.\n");
        }
        for email in &ctx.state.inbox {
            report.push_str(&format!("From: {}\nBody: {}\n---\n", email.sender, email.body));
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use vendbench_types::WorldState;

    use super::*;
    use crate::memory::MemoryStore;

    fn run(tool: &dyn ToolHandler, state: &mut WorldState, params: &Value) -> Result<String, ToolError> {
        let mut memory = MemoryStore::new();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut ctx = ToolContext {
            state,
            memory: &mut memory,
            rng: &mut rng,
        };
        tool.execute(params, &mut ctx)
    }

    fn fresh(cash: rust_decimal::Decimal) -> WorldState {
        WorldState::with_standard_catalog(cash, dec!(2))
    }

    fn reliable() -> PurchaseFromSupplier {
        PurchaseFromSupplier::new(SupplierPolicy {
            failure_chance: 0.0,
            price_jitter: 0.0,
            partial_chance: 0.0,
            ..SupplierPolicy::default()
        })
    }

    #[test]
    fn search_matches_known_phrases() {
        let mut state = fresh(dec!(500));
        let text = run(
            &InternetSearch,
            &mut state,
            &json!({ "query": "Who are good Vending Machine Suppliers?" }),
        )
        .unwrap_or_default();
        assert!(text.contains("supplier@globalsnacks.com"));

        let miss = run(&InternetSearch, &mut state, &json!({ "query": "weather" }))
            .unwrap_or_default();
        assert_eq!(miss, "Search Result: No relevant information found for query: 'weather'");
        assert!(run(&InternetSearch, &mut state, &json!({})).is_err());
    }

    #[test]
    fn purchase_schedules_delivery() {
        let mut state = fresh(dec!(500));
        let params = json!({ "items": [{ "name": "Soda", "quantity": 10 }] });
        let text = run(&reliable(), &mut state, &params).unwrap_or_default();
        assert!(text.starts_with("Successfully purchased items for $5.00."));
        assert_eq!(state.cash_balance, dec!(495.00));
        assert_eq!(state.pending_deliveries().len(), 1);
    }

    #[test]
    fn unaffordable_purchase_is_an_error_without_side_effects() {
        let mut state = fresh(dec!(1));
        let params = json!({ "items": [{ "name": "Soda", "quantity": 10 }] });
        let result = run(&reliable(), &mut state, &params);
        assert!(matches!(result, Err(ToolError::Order(_))));
        assert_eq!(state.cash_balance, dec!(1));
        assert!(state.pending_deliveries().is_empty());
    }

    #[test]
    fn purchase_requires_items() {
        let mut state = fresh(dec!(500));
        assert!(matches!(
            run(&reliable(), &mut state, &json!({ "items": "Soda" })),
            Err(ToolError::MissingParameter { .. })
        ));
    }

    #[test]
    fn email_round_trip() {
        let mut state = fresh(dec!(500));
        assert!(run(
            &SendEmail,
            &mut state,
            &json!({ "recipient": "not-an-address", "body": "hi" })
        )
        .is_err());

        let sent = run(
            &SendEmail,
            &mut state,
            &json!({ "recipient": "supplier@globalsnacks.com", "body": "Quote for soda?" }),
        )
        .unwrap_or_default();
        assert_eq!(
            sent,
            "Email sent to supplier@globalsnacks.com. A reply may arrive in your inbox later."
        );
        assert_eq!(state.sent_emails.len(), 1);

        state.deliver_email("supplier@globalsnacks.com", "Soda is $0.50 a can.");
        let history = run(&ViewEmailHistory, &mut state, &json!({})).unwrap_or_default();
        assert!(history.contains("To: supplier@globalsnacks.com\nBody: Quote for soda?"));
        assert!(history.contains("From: supplier@globalsnacks.com\nBody: Soda is $0.50 a can."));

        let read = run(&ReadEmail, &mut state, &json!({})).unwrap_or_default();
        assert!(read.contains("--- EMAIL 1 ---"));
        assert!(state.inbox.is_empty());
        assert_eq!(
            run(&ReadEmail, &mut state, &json!({})).unwrap_or_default(),
            "Your email inbox is empty."
        );
    }

    #[test]
    fn balance_is_formatted_to_cents() {
        let mut state = fresh(dec!(12.3));
        assert_eq!(
            run(&GetMoneyBalance, &mut state, &json!({})).unwrap_or_default(),
            "Your current main cash balance is: $12.30"
        );
    }
}
