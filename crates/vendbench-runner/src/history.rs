//! The decision agent's rolling turn history.
//!
//! Every completed turn is appended with an estimated token cost. When the
//! total exceeds the budget, the oldest turns are evicted and replaced by a
//! single summary turn at the front. The summary keeps only two facts from
//! what it replaces: supplier orders (with their result text) and day
//! advances. The newest turn is never evicted, so a single turn larger than
//! the budget leaves the history over budget.

use tracing::info;
use vendbench_types::{Turn, tools};

/// Opening of every summary turn's result text.
pub const SUMMARY_PREFIX: &str = "Summary of oldest events that were pruned from context: ";

/// Thought recorded on summary turns.
pub const SUMMARY_THOUGHT: &str = "Summary of pruned history.";

/// Estimated token count of `text`: one token per four characters,
/// rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

/// What a pruning pass removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    /// Turns evicted (a previous summary turn counts as one).
    pub removed_turns: usize,
    /// Token cost of the evicted turns.
    pub tokens_removed: usize,
    /// Total tokens after the summary turn was inserted.
    pub total_after: usize,
}

/// Ordered, token-budgeted turn history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnHistory {
    turns: Vec<Turn>,
    budget: usize,
}

impl TurnHistory {
    /// Empty history with a token `budget`.
    pub const fn new(budget: usize) -> Self {
        Self {
            turns: Vec::new(),
            budget,
        }
    }

    /// The token budget.
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Most recent turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns held.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Sum of all turns' token costs.
    pub fn total_tokens(&self) -> usize {
        self.turns
            .iter()
            .fold(0_usize, |acc, turn| acc.saturating_add(turn.tokens))
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Append a completed turn, pruning if the budget is exceeded.
    pub fn push(&mut self, thought: &str, action: &str, result: &str) -> Option<PruneReport> {
        let tokens = estimate_tokens(thought)
            .saturating_add(estimate_tokens(action))
            .saturating_add(estimate_tokens(result));
        self.turns.push(Turn {
            thought: thought.to_owned(),
            action: action.to_owned(),
            result: result.to_owned(),
            tokens,
        });
        self.prune()
    }

    /// Evict the oldest turns until the history, summary included, fits
    /// the budget or only the newest turn remains.
    fn prune(&mut self) -> Option<PruneReport> {
        let total = self.total_tokens();
        let excess = total.checked_sub(self.budget).filter(|e| *e > 0)?;

        let evictable = self.turns.len().saturating_sub(1);
        let mut summary = String::from(SUMMARY_PREFIX);
        let mut tokens_removed = 0_usize;
        let mut cut = 0_usize;
        for turn in self.turns.iter().take(evictable) {
            if tokens_removed >= excess.saturating_add(estimate_tokens(&summary)) {
                break;
            }
            match turn.tool_name().as_deref() {
                Some(tools::PURCHASE_FROM_SUPPLIER) => {
                    summary.push_str("An order was placed with result: '");
                    summary.push_str(&turn.result);
                    summary.push_str("'. ");
                }
                Some(tools::WAIT_FOR_NEXT_DAY) => summary.push_str("A day passed. "),
                _ => {}
            }
            tokens_removed = tokens_removed.saturating_add(turn.tokens);
            cut = cut.saturating_add(1);
        }
        if cut == 0 {
            return None;
        }

        self.turns.drain(..cut);
        let summary_tokens = estimate_tokens(&summary);
        self.turns.insert(
            0,
            Turn {
                thought: SUMMARY_THOUGHT.to_owned(),
                action: "{}".to_owned(),
                result: summary,
                tokens: summary_tokens,
            },
        );

        let report = PruneReport {
            removed_turns: cut,
            tokens_removed,
            total_after: self.total_tokens(),
        };
        info!(
            removed_turns = report.removed_turns,
            tokens_removed = report.tokens_removed,
            total_after = report.total_after,
            budget = self.budget,
            "Context history pruned and summarized"
        );
        Some(report)
    }
}
