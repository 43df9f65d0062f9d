//! One run's mutable world and the agents acting on it.
//!
//! The turn loop owns a [`Simulation`] behind a lock and plays one turn at
//! a time: deliveries for a new day, decision on a snapshot, watchdog,
//! dispatch, contact replies, history.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use vendbench_agents::{ExecutionAgent, MemoryStore, SafetyWatchdog, ToolContext, ToolRegistry};
use vendbench_runner::demand::seed_demand_profiles;
use vendbench_runner::{
    ContactDirectory, DecisionAgent, ParsedDecision, PromptEngine, ReplyGenerator, create_backend,
};
use vendbench_types::{Action, WorldState, tools};
use vendbench_world::{fulfill_due_deliveries, snapshot};

use crate::config::EngineConfig;
use crate::control::RunPhase;
use crate::error::OrchestratorError;
use crate::events::{EventKind, EventLog};
use crate::orchestrator::SimulationView;

/// Result text recorded when the agent's help request pauses the run.
const HELP_REQUESTED: &str = "Agent has requested human intervention. The simulation is paused.";

/// What a played turn led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The action ran and the turn counter advanced.
    Completed,
    /// The agent asked for help; no turn was consumed.
    AwaitingHumanInput,
    /// The watchdog flagged repeated actions.
    Meltdown,
}

/// A fresh world built from the configured money settings.
pub fn fresh_state(config: &EngineConfig) -> WorldState {
    WorldState::with_standard_catalog(
        config.simulation.initial_cash_balance,
        config.simulation.daily_fee,
    )
}

/// World state, memory, and agents for one run.
#[derive(Debug)]
pub struct Simulation {
    pub state: WorldState,
    pub memory: MemoryStore,
    pub decision: DecisionAgent,
    executor: ExecutionAgent,
    watchdog: SafetyWatchdog,
    replies: ReplyGenerator,
    rng: SmallRng,
    last_processed_day: u32,
}

impl Simulation {
    /// Configure the backend and tools, then seed demand for a fresh world.
    pub async fn build(config: &EngineConfig, events: &EventLog) -> Result<Self, OrchestratorError> {
        let backend = Arc::new(create_backend(&config.llm.backend_config()?)?);
        events.record(
            EventKind::SimulationSetup,
            "Orchestrator",
            format!("Language model backend configured: {}", backend.name()),
        );
        let prompts = Arc::new(match &config.agent.templates_dir {
            Some(dir) => PromptEngine::from_dir(dir)?,
            None => PromptEngine::builtin()?,
        });
        let registry = ToolRegistry::standard(
            &config.limits.tool_limits(),
            config.safety.human_help_enabled,
        );
        let watchdog = SafetyWatchdog::new(
            config.safety.meltdown_window,
            config.safety.meltdown_repeat_threshold,
        )?;

        let mut state = fresh_state(config);
        let seeded = seed_demand_profiles(&backend, &prompts, &mut state.storage).await;
        events.record(
            EventKind::SimulationSetup,
            "EconomicModel",
            format!("Demand profiles generated for {seeded} items."),
        );

        let rng = match config.simulation.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_rng(&mut rand::rng()),
        };

        Ok(Self {
            last_processed_day: state.day,
            state,
            memory: MemoryStore::new(),
            decision: DecisionAgent::new(
                Arc::clone(&backend),
                Arc::clone(&prompts),
                config.agent.persona.clone(),
                config.agent.max_context_tokens,
            ),
            executor: ExecutionAgent::new(registry),
            watchdog,
            replies: ReplyGenerator::new(backend, prompts, ContactDirectory::standard()),
            rng,
        })
    }

    /// Carry long-term notes over from a previous run.
    pub fn adopt_memory(&mut self, mut memory: MemoryStore) {
        memory.reset();
        self.memory = memory;
    }

    /// Hand back the memory store.
    pub fn into_memory(self) -> MemoryStore {
        self.memory
    }

    /// Return to a fresh world with empty history. Notes survive.
    pub fn reset(&mut self, config: &EngineConfig) {
        self.state = fresh_state(config);
        self.last_processed_day = self.state.day;
        self.memory.reset();
        self.decision.reset();
        self.watchdog.reset();
    }

    /// Names of the registered tools.
    pub fn tool_names(&self) -> Vec<String> {
        self.executor.tool_names()
    }

    /// Translate operator text into one action against a snapshot.
    pub async fn translate(&self, instruction: &str) -> ParsedDecision {
        let view = snapshot(&self.state);
        self.decision
            .translate_instruction(instruction, &view, &self.tool_names())
            .await
    }

    /// Snapshot for readers.
    pub fn view(&self, phase: RunPhase, max_turns: u32, events: &EventLog) -> SimulationView {
        SimulationView {
            phase,
            max_turns,
            net_worth: self.state.net_worth(),
            state: snapshot(&self.state),
            last_thought: self.decision.last_thought().to_owned(),
            history: self.decision.history().turns().to_vec(),
            events: events.recent(),
        }
    }

    /// Play one turn.
    ///
    /// Fails only on internal errors that make the decision prompt
    /// impossible to build; every other problem ends up in result text.
    pub async fn play_turn(
        &mut self,
        events: &EventLog,
        human_help_enabled: bool,
    ) -> Result<TurnOutcome, OrchestratorError> {
        events.record(
            EventKind::TurnStarted,
            "Orchestrator",
            format!("Turn {} (Day {}) started.", self.state.turn, self.state.day),
        );

        if self.state.day > self.last_processed_day {
            self.roll_over_day(events);
        }

        let view = snapshot(&self.state);
        let tool_names = self.executor.tool_names();
        let action = self
            .decision
            .decide(&view, self.memory.scratchpad(), &tool_names)
            .await?;
        if let Some(report) = self.decision.take_prune_report() {
            record_prune(events, report);
        }
        events.record(
            EventKind::ToolCall,
            "DecisionAgent",
            format!("{} {}", action.tool, action.serialized_parameters()),
        );

        self.watchdog.record(&action);
        if self.watchdog.is_meltdown_detected() {
            events.record(
                EventKind::Meltdown,
                "SafetyWatchdog",
                format!(
                    "Meltdown detected: the agent keeps repeating '{}'. Simulation halted.",
                    action.tool
                ),
            );
            return Ok(TurnOutcome::Meltdown);
        }

        if human_help_enabled && action.is(tools::ASK_FOR_HUMAN_HELP) {
            if let Some(report) = self.decision.absorb(HELP_REQUESTED) {
                record_prune(events, report);
            }
            events.record(
                EventKind::HumanIntervention,
                "DecisionAgent",
                format!("Agent requested human help: {}", self.decision.last_thought()),
            );
            return Ok(TurnOutcome::AwaitingHumanInput);
        }

        let sent_before = self.state.sent_emails.len();
        let result = self.execute(&action);
        events.record(EventKind::ToolResult, "ExecutionAgent", result.clone());
        self.answer_new_email(sent_before, events).await;
        if let Some(report) = self.decision.absorb(&result) {
            record_prune(events, report);
        }

        self.state.advance_turn();
        Ok(TurnOutcome::Completed)
    }

    fn execute(&mut self, action: &Action) -> String {
        let mut ctx = ToolContext {
            state: &mut self.state,
            memory: &mut self.memory,
            rng: &mut self.rng,
        };
        self.executor.run(action, &mut ctx)
    }

    fn roll_over_day(&mut self, events: &EventLog) {
        let report = fulfill_due_deliveries(&mut self.state);
        if let Some(summary) = report.summary() {
            events.record(EventKind::DeliveryReceived, "Supplier", summary);
        }
        for (name, quantity) in &report.rejected {
            events.record(
                EventKind::Error,
                "Supplier",
                format!("Delivery of {quantity} units of unknown item '{name}' was discarded."),
            );
        }
        self.last_processed_day = self.state.day;
    }

    /// Generate contact replies for every email sent since `sent_before`.
    async fn answer_new_email(&mut self, sent_before: usize, events: &EventLog) {
        let outgoing: Vec<(String, String)> = self
            .state
            .sent_emails
            .iter()
            .skip(sent_before)
            .map(|email| (email.recipient.clone(), email.body.clone()))
            .collect();
        for (recipient, body) in outgoing {
            let reply = self.replies.reply(&recipient, &body).await;
            self.state.deliver_email(&recipient, &reply);
            events.record(
                EventKind::EmailReceived,
                "ReplyGenerator",
                format!("Reply received from {recipient}"),
            );
        }
    }
}

fn record_prune(events: &EventLog, report: vendbench_runner::PruneReport) {
    events.record(
        EventKind::ContextPruned,
        "DecisionAgent",
        format!(
            "Pruned {} turns ({} tokens) from history; {} tokens remain.",
            report.removed_turns, report.tokens_removed, report.total_after
        ),
    );
}
