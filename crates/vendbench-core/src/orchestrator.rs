//! The orchestrator: lifecycle API and the turn loop behind it.
//!
//! [`Orchestrator`] is the handle callers hold. The turn loop runs on its
//! own task and is the only writer of the world state; it publishes a
//! [`SimulationView`] after every turn for readers. Operator operations
//! change the run phase through [`RunControl`], which the loop waits on
//! while suspended.
//!
//! A panic inside the loop is caught at the task boundary and turns the
//! run into [`RunPhase::Error`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::FutureExt;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vendbench_runner::ParsedDecision;
use vendbench_runner::decision::INITIAL_THOUGHT;
use vendbench_types::{Action, Turn, WorldState};

use crate::config::EngineConfig;
use crate::control::{RunControl, RunPhase, Wake};
use crate::error::OrchestratorError;
use crate::events::{EventEntry, EventKind, EventLog};
use crate::simulation::{Simulation, TurnOutcome, fresh_state};

/// How long `reset` waits for the loop to stop before aborting it.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Thought attached to the no-op injected when a help request times out.
const HELP_TIMEOUT_THOUGHT: &str = "No human input arrived in time, so I will continue on my own.";

/// Point-in-time view of a run for external readers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationView {
    /// Run phase.
    pub phase: RunPhase,
    /// Turn limit for the run.
    pub max_turns: u32,
    /// Copy of the world state.
    pub state: WorldState,
    /// Cash, machine cash, and stock at wholesale cost.
    pub net_worth: Decimal,
    /// Reasoning behind the latest decision.
    pub last_thought: String,
    /// The decision agent's history.
    pub history: Vec<Turn>,
    /// Recent events, oldest first.
    pub events: Vec<EventEntry>,
}

impl SimulationView {
    fn idle(state: WorldState, max_turns: u32) -> Self {
        Self {
            phase: RunPhase::Idle,
            max_turns,
            net_worth: state.net_worth(),
            state,
            last_thought: INITIAL_THOUGHT.to_owned(),
            history: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Loop settings fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy)]
struct LoopSettings {
    turn_delay: Duration,
    human_help_enabled: bool,
    human_help_timeout: Option<Duration>,
}

impl LoopSettings {
    const fn from_config(config: &EngineConfig) -> Self {
        Self {
            turn_delay: config.simulation.turn_delay(),
            human_help_enabled: config.safety.human_help_enabled,
            human_help_timeout: config.safety.human_help_timeout(),
        }
    }
}

/// State shared between the handle and the loop task.
#[derive(Debug)]
struct Shared {
    control: RunControl,
    events: EventLog,
    sim: Mutex<Option<Simulation>>,
    view: watch::Sender<SimulationView>,
    max_turns: AtomicU32,
}

impl Shared {
    fn publish(&self, sim: &Simulation) {
        let view = sim.view(
            self.control.phase(),
            self.max_turns.load(Ordering::Acquire),
            &self.events,
        );
        self.view.send_replace(view);
    }

    fn halt(&self, sim: Option<&Simulation>, message: String) {
        self.events.record(EventKind::Error, "Orchestrator", message);
        self.control.set_phase(RunPhase::Error);
        if let Some(sim) = sim {
            self.publish(sim);
        }
    }

    async fn resume_after_timeout(&self) {
        self.events.record(
            EventKind::HumanIntervention,
            "Orchestrator",
            "No human response before the timeout; resuming autonomously.",
        );
        if let Some(sim) = self.sim.lock().await.as_mut() {
            sim.decision.set_override(ParsedDecision {
                thought: HELP_TIMEOUT_THOUGHT.to_owned(),
                action: Action::idle(),
            });
        }
        if let Err(e) = self.control.transition(
            "resume after timeout",
            RunPhase::Running,
            |phase| phase == RunPhase::AwaitingHumanInput,
        ) {
            debug!(error = %e, "Help timeout raced another transition");
        }
    }
}

/// Owns one simulation run and exposes its lifecycle.
#[derive(Debug)]
pub struct Orchestrator {
    config: EngineConfig,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Create an idle orchestrator.
    pub fn new(config: EngineConfig) -> Self {
        let max_turns = config.simulation.max_turns;
        let (view, _) = watch::channel(SimulationView::idle(fresh_state(&config), max_turns));
        Self {
            shared: Arc::new(Shared {
                control: RunControl::new(),
                events: EventLog::new(),
                sim: Mutex::new(None),
                view,
                max_turns: AtomicU32::new(max_turns),
            }),
            config,
            worker: Mutex::new(None),
        }
    }

    /// The configuration runs are started with.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current phase.
    pub fn phase(&self) -> RunPhase {
        self.shared.control.phase()
    }

    /// Receiver notified on every phase change.
    pub fn phases(&self) -> watch::Receiver<RunPhase> {
        self.shared.control.subscribe()
    }

    /// Receiver notified whenever the loop publishes a new view.
    pub fn subscribe(&self) -> watch::Receiver<SimulationView> {
        self.shared.view.subscribe()
    }

    /// The latest published view with the current phase and events.
    pub fn snapshot(&self) -> SimulationView {
        let mut view = self.shared.view.borrow().clone();
        view.phase = self.phase();
        view.max_turns = self.shared.max_turns.load(Ordering::Acquire);
        view.events = self.shared.events.recent();
        view
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start a fresh run.
    ///
    /// Rejected while a run is active. Builds the backend and tools, seeds
    /// demand profiles, then launches the turn loop. Long-term notes from a
    /// previous run carry over.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        self.shared
            .control
            .transition("start", RunPhase::Initializing, |phase| !phase.is_active())?;
        self.stop_worker().await;
        self.shared.control.clear_stop();
        self.shared.events.clear();

        let mut sim = match Simulation::build(&self.config, &self.shared.events).await {
            Ok(sim) => sim,
            Err(e) => {
                self.shared.halt(None, format!("Simulation failed to start: {e}"));
                return Err(e);
            }
        };

        let max_turns = self.config.simulation.max_turns;
        self.shared.max_turns.store(max_turns, Ordering::Release);
        {
            let mut guard = self.shared.sim.lock().await;
            if let Some(previous) = guard.take() {
                sim.adopt_memory(previous.into_memory());
            }
            self.shared.control.set_phase(RunPhase::Running);
            self.shared.publish(&sim);
            *guard = Some(sim);
        }

        self.shared.events.record(
            EventKind::SimulationStatus,
            "Orchestrator",
            format!(
                "Simulation started: {max_turns} turns, initial cash ${}.",
                self.config.simulation.initial_cash_balance
            ),
        );
        self.spawn_worker().await;
        Ok(())
    }

    /// Pause a running run, or resume a paused one. Returns the new phase.
    ///
    /// Not allowed while awaiting human input.
    pub fn toggle_pause(&self) -> Result<RunPhase, OrchestratorError> {
        let control = &self.shared.control;
        let to = match control.phase() {
            RunPhase::Running => RunPhase::Paused,
            RunPhase::Paused => RunPhase::Running,
            from => {
                return Err(OrchestratorError::InvalidTransition {
                    from,
                    operation: "toggle pause",
                });
            }
        };
        let from = control.transition("toggle pause", to, |phase| {
            matches!(phase, RunPhase::Running | RunPhase::Paused) && phase != to
        })?;
        let message = if to == RunPhase::Paused {
            "Simulation paused by operator."
        } else {
            "Simulation resumed by operator."
        };
        self.shared
            .events
            .record(EventKind::HumanIntervention, "Operator", message);
        debug!(from = %from, to = %to, "Pause toggled");
        Ok(to)
    }

    /// Translate operator text into the next action and resume.
    ///
    /// Valid only while paused or awaiting human input. The translated
    /// action runs as the next turn instead of asking the model.
    pub async fn resume_with_human_input(&self, instruction: &str) -> Result<Action, OrchestratorError> {
        let from = self.phase();
        if !from.is_suspended() {
            return Err(OrchestratorError::InvalidTransition {
                from,
                operation: "resume with human input",
            });
        }

        let action = {
            let mut guard = self.shared.sim.lock().await;
            let Some(sim) = guard.as_mut() else {
                return Err(OrchestratorError::InvalidTransition {
                    from,
                    operation: "resume with human input",
                });
            };
            if sim.decision.has_override() {
                debug!("Replacing an operator instruction that has not run yet");
            }
            let decision = sim.translate(instruction).await;
            let action = decision.action.clone();
            self.shared.events.record(
                EventKind::HumanIntervention,
                "Operator",
                format!(
                    "Human instruction '{instruction}' translated to {} {}",
                    action.tool,
                    action.serialized_parameters()
                ),
            );
            sim.decision.set_override(decision);
            self.shared.publish(sim);
            action
        };

        self.shared.control.transition(
            "resume with human input",
            RunPhase::Running,
            RunPhase::is_suspended,
        )?;
        Ok(action)
    }

    /// Extend the current run by `turns`. A finished run resumes.
    ///
    /// Returns the new turn limit.
    pub async fn add_turns(&self, turns: u32) -> Result<u32, OrchestratorError> {
        if turns == 0 {
            return Err(OrchestratorError::InvalidArgument {
                message: "turns to add must be positive".to_owned(),
            });
        }
        let previous = self
            .shared
            .max_turns
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |max| {
                Some(max.saturating_add(turns))
            })
            .unwrap_or_else(|max| max);
        let max_turns = previous.saturating_add(turns);
        self.shared.events.record(
            EventKind::SimulationStatus,
            "Operator",
            format!("Added {turns} turns; the run now ends after turn {max_turns}."),
        );

        if self
            .shared
            .control
            .transition("add turns", RunPhase::Running, |phase| phase == RunPhase::Finished)
            .is_ok()
        {
            self.stop_worker().await;
            self.shared.control.clear_stop();
            self.spawn_worker().await;
        }
        Ok(max_turns)
    }

    /// Stop any run and return to a fresh, idle world.
    ///
    /// Waits briefly for the loop to stop, then aborts it. History,
    /// scratchpad, key/value memory, and events are cleared; long-term
    /// notes survive.
    pub async fn reset(&self) {
        self.shared.control.request_stop();
        self.stop_worker().await;

        let max_turns = self.config.simulation.max_turns;
        self.shared.max_turns.store(max_turns, Ordering::Release);
        self.shared.events.clear();

        let mut guard = self.shared.sim.lock().await;
        self.shared.control.clear_stop();
        self.shared.control.set_phase(RunPhase::Idle);
        match guard.as_mut() {
            Some(sim) => {
                sim.reset(&self.config);
                self.shared.publish(sim);
            }
            None => {
                self.shared
                    .view
                    .send_replace(SimulationView::idle(fresh_state(&self.config), max_turns));
            }
        }
        info!("Simulation reset");
    }

    // -----------------------------------------------------------------------
    // Worker management
    // -----------------------------------------------------------------------

    async fn spawn_worker(&self) {
        let shared = Arc::clone(&self.shared);
        let settings = LoopSettings::from_config(&self.config);
        let handle = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(run_loop(Arc::clone(&shared), settings))
                .catch_unwind()
                .await;
            if outcome.is_err() {
                shared.halt(None, "Turn loop panicked; simulation halted.".to_owned());
            }
        });
        *self.worker.lock().await = Some(handle);
    }

    async fn stop_worker(&self) {
        let Some(handle) = self.worker.lock().await.take() else {
            return;
        };
        let abort = handle.abort_handle();
        if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
            warn!(grace_secs = STOP_GRACE.as_secs(), "Turn loop did not stop in time, aborting");
            abort.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Turn loop
// ---------------------------------------------------------------------------

async fn run_loop(shared: Arc<Shared>, settings: LoopSettings) {
    info!(
        max_turns = shared.max_turns.load(Ordering::Acquire),
        turn_delay_ms = settings.turn_delay.as_millis(),
        "Turn loop started"
    );

    loop {
        if shared.control.is_stop_requested() {
            info!("Turn loop stop requested");
            break;
        }

        match shared.control.phase() {
            RunPhase::Running => {}
            phase if phase.is_suspended() => {
                let deadline = if phase == RunPhase::AwaitingHumanInput {
                    settings.human_help_timeout
                } else {
                    None
                };
                info!(phase = %phase, "Turn loop suspended");
                match shared.control.wait_while_suspended(deadline).await {
                    Wake::Resumed => info!("Turn loop resumed"),
                    Wake::Stopped => break,
                    Wake::TimedOut => shared.resume_after_timeout().await,
                }
                continue;
            }
            phase => {
                debug!(phase = %phase, "Turn loop exiting");
                break;
            }
        }

        let mut guard = shared.sim.lock().await;
        let Some(sim) = guard.as_mut() else {
            shared.halt(None, "Turn loop has no simulation to run.".to_owned());
            break;
        };

        let max_turns = shared.max_turns.load(Ordering::Acquire);
        if sim.state.turn > max_turns {
            shared.events.record(
                EventKind::SimulationStatus,
                "Orchestrator",
                format!(
                    "Simulation finished after {max_turns} turns on day {}. Final net worth: ${}.",
                    sim.state.day,
                    sim.state.net_worth()
                ),
            );
            shared.control.set_phase(RunPhase::Finished);
            shared.publish(sim);
            break;
        }

        match sim.play_turn(&shared.events, settings.human_help_enabled).await {
            Ok(TurnOutcome::Completed) => shared.publish(sim),
            Ok(TurnOutcome::AwaitingHumanInput) => {
                if let Err(e) = shared.control.transition(
                    "request human help",
                    RunPhase::AwaitingHumanInput,
                    |phase| matches!(phase, RunPhase::Running | RunPhase::Paused),
                ) {
                    debug!(error = %e, "Help request raced another transition");
                }
                shared.publish(sim);
                continue;
            }
            Ok(TurnOutcome::Meltdown) => {
                shared.control.set_phase(RunPhase::Error);
                shared.publish(sim);
                break;
            }
            Err(e) => {
                shared.halt(Some(sim), format!("Simulation halted: {e}"));
                break;
            }
        }
        drop(guard);

        if shared.control.sleep_unless_stopped(settings.turn_delay).await {
            break;
        }
    }

    info!(phase = %shared.control.phase(), "Turn loop ended");
}
