//! The decision agent: world state plus history in, one action out.
//!
//! Each call to [`DecisionAgent::decide`] renders the decision prompt from
//! a snapshot of the world, asks the backend for a completion and parses
//! it. The chosen action is held as a pending turn until the orchestrator
//! reports the tool result through [`DecisionAgent::absorb`], at which
//! point the turn enters the token-budgeted [`TurnHistory`].
//!
//! Malformed responses and unknown tools never surface as errors. They are
//! written into history as synthetic entries and the turn degrades to
//! [`Action::idle`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use vendbench_types::{Action, Turn, WorldState};

use crate::error::RunnerError;
use crate::history::{PruneReport, TurnHistory};
use crate::llm::LlmBackend;
use crate::parse::{ParsedDecision, parse_decision};
use crate::prompt::{PromptEngine, PromptKind};

/// Last thought reported before the first decision.
pub const INITIAL_THOUGHT: &str = "Waiting for first turn.";

/// Thought recorded for history entries describing a bad response.
const PARSE_ERROR_THOUGHT: &str = "The previous response could not be understood.";

/// Thought used when an operator instruction cannot be translated.
const UNTRANSLATED_THOUGHT: &str = "The operator instruction could not be translated into a command.";

#[derive(Debug, Serialize)]
struct DecisionContext<'a> {
    persona: &'a str,
    scratchpad: &'a str,
    history: &'a [Turn],
    state: String,
    tools: &'a [String],
}

#[derive(Debug, Serialize)]
struct InstructionContext<'a> {
    instruction: &'a str,
    state: String,
    tools: &'a [String],
}

#[derive(Debug, Clone)]
struct PendingTurn {
    thought: String,
    action: String,
}

/// Produces one action per turn and keeps the agent's own history.
#[derive(Debug)]
pub struct DecisionAgent {
    backend: Arc<LlmBackend>,
    prompts: Arc<PromptEngine>,
    persona: String,
    history: TurnHistory,
    forced: Option<ParsedDecision>,
    pending: Option<PendingTurn>,
    pending_prune: Option<PruneReport>,
    last_thought: String,
}

impl DecisionAgent {
    /// Create an agent with an empty history bounded by `max_context_tokens`.
    pub fn new(
        backend: Arc<LlmBackend>,
        prompts: Arc<PromptEngine>,
        persona: impl Into<String>,
        max_context_tokens: usize,
    ) -> Self {
        Self {
            backend,
            prompts,
            persona: persona.into(),
            history: TurnHistory::new(max_context_tokens),
            forced: None,
            pending: None,
            pending_prune: None,
            last_thought: INITIAL_THOUGHT.to_owned(),
        }
    }

    /// Decide the next action against `state`.
    ///
    /// A forced action set through [`set_override`](Self::set_override)
    /// is returned first, without calling the backend.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] only when the prompt cannot be built: the
    /// state fails to serialize or a template fails to render.
    pub async fn decide(
        &mut self,
        state: &WorldState,
        scratchpad: &str,
        tools: &[String],
    ) -> Result<Action, RunnerError> {
        if let Some(forced) = self.forced.take() {
            info!(tool = %forced.action.tool, "Executing operator instruction");
            return Ok(self.commit(forced));
        }

        let context = DecisionContext {
            persona: &self.persona,
            scratchpad,
            history: self.history.turns(),
            state: serde_json::to_string_pretty(state)?,
            tools,
        };
        let prompt = self.prompts.render(PromptKind::Decision, &context)?;
        let raw = self.backend.generate(&prompt).await;
        debug!(backend = self.backend.name(), len = raw.len(), "Decision response received");

        let decision = match parse_decision(&raw) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "Could not parse decision response, idling this turn");
                self.pending = None;
                self.last_thought = PARSE_ERROR_THOUGHT.to_owned();
                self.pending_prune = self.history.push(
                    PARSE_ERROR_THOUGHT,
                    "{}",
                    &format!("Error: Could not parse LLM response. Ensure it's valid JSON. Response: {raw}"),
                );
                return Ok(Action::idle());
            }
        };

        if !tools.iter().any(|name| *name == decision.action.tool) {
            warn!(tool = %decision.action.tool, "Decision named an unknown tool, idling this turn");
            self.pending = None;
            self.pending_prune = self.history.push(
                &decision.thought,
                &decision.action.to_json(),
                &format!("Agent attempted to use an unknown tool: {}", decision.action.tool),
            );
            self.last_thought = decision.thought;
            return Ok(Action::idle());
        }

        Ok(self.commit(decision))
    }

    /// Record the result of the pending action as a completed turn.
    ///
    /// Returns the pruning report when recording the turn pushed the
    /// history over its budget. Without a pending action this is a no-op.
    pub fn absorb(&mut self, result: &str) -> Option<PruneReport> {
        let pending = self.pending.take()?;
        self.history.push(&pending.thought, &pending.action, result)
    }

    /// Pruning caused by an error entry that [`decide`](Self::decide)
    /// wrote itself, if any. Taking it clears it.
    pub const fn take_prune_report(&mut self) -> Option<PruneReport> {
        self.pending_prune.take()
    }

    /// Translate operator free text into exactly one action.
    ///
    /// Uses the translate-only prompt, so neither persona nor history is
    /// sent, and the agent's history is left untouched. Anything that does
    /// not resolve to a known tool becomes [`Action::idle`].
    pub async fn translate_instruction(
        &self,
        instruction: &str,
        state: &WorldState,
        tools: &[String],
    ) -> ParsedDecision {
        let untranslated = || ParsedDecision {
            thought: UNTRANSLATED_THOUGHT.to_owned(),
            action: Action::idle(),
        };

        let state = match serde_json::to_string_pretty(state) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Could not serialize state for instruction");
                return untranslated();
            }
        };
        let context = InstructionContext {
            instruction,
            state,
            tools,
        };
        let prompt = match self.prompts.render(PromptKind::Instruction, &context) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Could not render instruction prompt");
                return untranslated();
            }
        };

        let raw = self.backend.generate(&prompt).await;
        match parse_decision(&raw) {
            Ok(decision) if tools.iter().any(|name| *name == decision.action.tool) => {
                info!(tool = %decision.action.tool, "Operator instruction translated");
                decision
            }
            Ok(decision) => {
                warn!(tool = %decision.action.tool, "Instruction translated to an unknown tool");
                untranslated()
            }
            Err(e) => {
                warn!(error = %e, "Could not parse instruction translation");
                untranslated()
            }
        }
    }

    /// Force the next [`decide`](Self::decide) to return `decision`.
    pub fn set_override(&mut self, decision: ParsedDecision) {
        self.forced = Some(decision);
    }

    /// Whether a forced action is waiting.
    pub const fn has_override(&self) -> bool {
        self.forced.is_some()
    }

    /// The rolling history.
    pub const fn history(&self) -> &TurnHistory {
        &self.history
    }

    /// Reasoning behind the most recent decision.
    pub fn last_thought(&self) -> &str {
        &self.last_thought
    }

    /// Drop history, any forced or pending action, and the last thought.
    pub fn reset(&mut self) {
        self.history.clear();
        self.forced = None;
        self.pending = None;
        self.pending_prune = None;
        self.last_thought = INITIAL_THOUGHT.to_owned();
    }

    fn commit(&mut self, decision: ParsedDecision) -> Action {
        self.pending = Some(PendingTurn {
            thought: decision.thought.clone(),
            action: decision.action.to_json(),
        });
        self.last_thought = decision.thought;
        decision.action
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;
    use vendbench_types::tools;

    use super::*;
    use crate::llm::ScriptedBackend;

    fn agent(responses: &[&str], budget: usize) -> DecisionAgent {
        let prompts = PromptEngine::builtin().unwrap_or_else(|e| panic!("builtin templates: {e}"));
        DecisionAgent::new(
            Arc::new(LlmBackend::Scripted(ScriptedBackend::new(responses.iter().copied()))),
            Arc::new(prompts),
            "tester",
            budget,
        )
    }

    fn state() -> WorldState {
        WorldState::with_standard_catalog(dec!(500), dec!(2))
    }

    fn tool_names() -> Vec<String> {
        [tools::COLLECT_CASH, tools::IDLE, tools::SET_PRICES, tools::ASK_FOR_HUMAN_HELP]
            .iter()
            .map(|t| (*t).to_owned())
            .collect()
    }

    #[tokio::test]
    async fn valid_response_becomes_pending_turn() {
        let mut agent = agent(
            &[r#"{"thought": "cash in", "action": {"tool": "collect_cash", "parameters": {}}}"#],
            10_000,
        );
        let Ok(action) = agent.decide(&state(), "", &tool_names()).await else {
            panic!("decide failed");
        };
        assert!(action.is(tools::COLLECT_CASH));
        assert_eq!(agent.last_thought(), "cash in");
        assert!(agent.history().is_empty());

        assert!(agent.absorb("Collected $0.00").is_none());
        let turns = agent.history().turns();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns.first().map(|t| t.result.as_str()), Some("Collected $0.00"));
        assert_eq!(turns.first().and_then(Turn::tool_name).as_deref(), Some(tools::COLLECT_CASH));
    }

    #[tokio::test]
    async fn malformed_response_records_error_and_idles() {
        let mut agent = agent(&["I think I will restock"], 10_000);
        let Ok(action) = agent.decide(&state(), "", &tool_names()).await else {
            panic!("decide failed");
        };
        assert!(action.is(tools::IDLE));
        let result = agent.history().last().map(|t| t.result.clone()).unwrap_or_default();
        assert_eq!(
            result,
            "Error: Could not parse LLM response. Ensure it's valid JSON. Response: I think I will restock"
        );
        // The idle turn itself is not recorded a second time.
        assert!(agent.absorb("Agent is idle").is_none());
        assert_eq!(agent.history().len(), 1);
    }

    #[tokio::test]
    async fn oversized_bad_response_reports_its_pruning() {
        let garbage = "x".repeat(400);
        let mut agent = agent(
            &[
                r#"{"thought": "cash in", "action": {"tool": "collect_cash", "parameters": {}}}"#,
                garbage.as_str(),
            ],
            40,
        );
        let Ok(_) = agent.decide(&state(), "", &tool_names()).await else {
            panic!("decide failed");
        };
        assert!(agent.absorb("Collected $0.00").is_none());
        assert!(agent.take_prune_report().is_none());

        let Ok(action) = agent.decide(&state(), "", &tool_names()).await else {
            panic!("decide failed");
        };
        assert!(action.is(tools::IDLE));
        let Some(report) = agent.take_prune_report() else {
            panic!("the error entry should have pruned the older turn");
        };
        assert_eq!(report.removed_turns, 1);
        assert!(agent.take_prune_report().is_none(), "taking clears the report");

        let first = agent.history().turns().first().map(|t| t.thought.clone());
        assert_eq!(first.as_deref(), Some(crate::history::SUMMARY_THOUGHT));
    }

    #[tokio::test]
    async fn unknown_tool_records_error_and_idles() {
        let mut agent = agent(
            &[r#"{"thought": "fly", "action": {"tool": "launch_rocket", "parameters": {}}}"#],
            10_000,
        );
        let Ok(action) = agent.decide(&state(), "", &tool_names()).await else {
            panic!("decide failed");
        };
        assert!(action.is(tools::IDLE));
        let result = agent.history().last().map(|t| t.result.clone()).unwrap_or_default();
        assert_eq!(result, "Agent attempted to use an unknown tool: launch_rocket");
    }

    #[tokio::test]
    async fn backend_failure_asks_for_help() {
        let mut agent = agent(&[], 10_000);
        let Ok(action) = agent.decide(&state(), "", &tool_names()).await else {
            panic!("decide failed");
        };
        assert!(action.is(tools::ASK_FOR_HUMAN_HELP));
    }

    #[tokio::test]
    async fn override_skips_backend() {
        let mut agent = agent(&[], 10_000);
        agent.set_override(ParsedDecision {
            thought: "operator says".to_owned(),
            action: Action::new(tools::SET_PRICES, json!({"prices": []})),
        });
        let Ok(action) = agent.decide(&state(), "", &tool_names()).await else {
            panic!("decide failed");
        };
        assert!(action.is(tools::SET_PRICES));
        assert!(!agent.has_override());
        assert_eq!(agent.last_thought(), "operator says");
    }

    #[tokio::test]
    async fn translation_leaves_history_alone() {
        let agent = agent(
            &[r#"{"thought": "x", "action": {"tool": "collect_cash", "parameters": {}}}"#],
            10_000,
        );
        let decision = agent
            .translate_instruction("collect the cash", &state(), &tool_names())
            .await;
        assert!(decision.action.is(tools::COLLECT_CASH));
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn unknown_translation_becomes_idle() {
        let agent = agent(
            &[r#"{"thought": "x", "action": {"tool": "teleport", "parameters": {}}}"#],
            10_000,
        );
        let decision = agent.translate_instruction("teleport", &state(), &tool_names()).await;
        assert!(decision.action.is(tools::IDLE));
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let mut agent = agent(&["garbage"], 10_000);
        let _ = agent.decide(&state(), "", &tool_names()).await;
        agent.reset();
        assert!(agent.history().is_empty());
        assert_eq!(agent.last_thought(), INITIAL_THOUGHT);
    }
}
