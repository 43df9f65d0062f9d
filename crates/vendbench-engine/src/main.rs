//! Engine binary for the vending benchmark.
//!
//! Loads configuration, installs logging, starts a run, and then reads
//! operator commands from stdin until the run ends or the operator quits.
//!
//! # Startup Sequence
//!
//! 1. Resolve the config path (first argument, `VENDBENCH_CONFIG`, or
//!    `vendbench-config.yaml`)
//! 2. Load configuration, falling back to defaults when the file is absent
//! 3. Initialize structured logging (tracing)
//! 4. Start the run
//! 5. Serve the operator console until `Finished`, `Error`, `quit`, or Ctrl-C
//! 6. Log the final summary

mod console;
mod error;

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vendbench_core::config::LoggingConfig;
use vendbench_core::{EngineConfig, Orchestrator, SimulationView};

use crate::console::{Command, USAGE};
use crate::error::EngineError;

/// Config file used when neither an argument nor `VENDBENCH_CONFIG` is given.
const DEFAULT_CONFIG_PATH: &str = "vendbench-config.yaml";

/// What the console loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the initial start fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1-2. Load configuration.
    let config_path = config_path();
    let (config, found) = load_config(&config_path)?;

    // 3. Initialize structured logging.
    init_logging(&config.logging)?;
    info!("vendbench-engine starting");
    if !found {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        path = %config_path.display(),
        provider = config.llm.provider,
        max_turns = config.simulation.max_turns,
        turn_delay_ms = config.simulation.turn_delay_ms,
        initial_cash = %config.simulation.initial_cash_balance,
        "Configuration loaded"
    );

    // 4. Start the run.
    let orchestrator = Orchestrator::new(config);
    orchestrator.start().await.map_err(EngineError::from)?;
    info!("{USAGE}");

    // 5. Operator console.
    operate(&orchestrator).await;

    // 6. Final summary.
    log_summary(&orchestrator.snapshot());
    if !orchestrator.phase().is_terminal() {
        orchestrator.reset().await;
    }
    info!("vendbench-engine shutdown complete");
    Ok(())
}

/// Resolve the config path from the command line or the environment.
fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("VENDBENCH_CONFIG").ok())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration, returning defaults (with environment overrides) when
/// the file does not exist. The flag reports whether the file was found.
fn load_config(path: &Path) -> Result<(EngineConfig, bool), EngineError> {
    if path.exists() {
        Ok((EngineConfig::from_file(path)?, true))
    } else {
        Ok((EngineConfig::parse("")?, false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &LoggingConfig) -> Result<(), EngineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EngineError::Logging {
            message: format!("invalid log level '{}': {e}", config.level),
        })?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}

/// Serve operator commands until the run ends, the operator quits, or an
/// interrupt arrives.
async fn operate(orchestrator: &Orchestrator) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut views = orchestrator.subscribe();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match line.parse::<Command>() {
                        Ok(command) => match apply(orchestrator, command).await {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Quit) => {
                                info!("Operator quit");
                                break;
                            }
                            Err(e) => warn!(error = %e, "Command failed"),
                        },
                        Err(e) => warn!(error = %e, "Command rejected"),
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, console disabled");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin, console disabled");
                    stdin_open = false;
                }
            },
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let phase = views.borrow_and_update().phase;
                if phase.is_terminal() {
                    info!(phase = %phase, "Run ended");
                    break;
                }
            },
            interrupted = tokio::signal::ctrl_c() => {
                if let Err(e) = interrupted {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Interrupt received, stopping");
                break;
            },
        }
    }
}

/// Apply one operator command.
async fn apply(orchestrator: &Orchestrator, command: Command) -> Result<Flow, EngineError> {
    match command {
        Command::Pause => {
            let phase = orchestrator.toggle_pause()?;
            info!(phase = %phase, "Pause toggled");
        }
        Command::Help(instruction) => {
            let action = orchestrator.resume_with_human_input(&instruction).await?;
            info!(
                tool = action.tool,
                parameters = %action.serialized_parameters(),
                "Resuming with operator instruction"
            );
        }
        Command::AddTurns(turns) => {
            let max_turns = orchestrator.add_turns(turns).await?;
            info!(added = turns, max_turns, "Turns added");
        }
        Command::Status => log_status(&orchestrator.snapshot()),
        Command::Reset => {
            orchestrator.reset().await;
            orchestrator.start().await?;
            info!("Run reset and restarted");
        }
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn log_status(view: &SimulationView) {
    info!(
        phase = %view.phase,
        turn = view.state.turn,
        max_turns = view.max_turns,
        day = view.state.day,
        cash_balance = %view.state.cash_balance,
        machine_cash = %view.state.machine.cash_held(),
        net_worth = %view.net_worth,
        last_thought = view.last_thought,
        "Status"
    );
    for event in view.events.iter().rev().take(5).rev() {
        info!(kind = ?event.kind, source = event.source, "{}", event.message);
    }
}

fn log_summary(view: &SimulationView) {
    info!(
        phase = %view.phase,
        turns_played = view.state.turn.saturating_sub(1),
        days = view.state.day,
        units_sold = view.state.total_units_sold,
        cash_balance = %view.state.cash_balance,
        net_worth = %view.net_worth,
        "Simulation summary"
    );
}
