//! Integration tests for the orchestrator lifecycle.
//!
//! Every run uses the offline `scripted` backend. The first three scripted
//! responses are always consumed by demand seeding (one per stored item),
//! so each test queues those before its decisions.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::time::Duration;

use rust_decimal_macros::dec;
use serde_json::{Value, json};
use vendbench_core::{EngineConfig, EventKind, Orchestrator, OrchestratorError, RunPhase};

const DEMAND: &str = r#"{"elasticity": -1.2, "reference_price": 1.5, "base_sales": 30}"#;

fn decision(tool: &str, parameters: Value) -> String {
    json!({
        "thought": format!("I will use {tool}."),
        "action": {"tool": tool, "parameters": parameters}
    })
    .to_string()
}

fn config(decisions: &[String], max_turns: u32) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.llm.provider = "scripted".to_owned();
    config.llm.scripted_responses = [DEMAND, DEMAND, DEMAND]
        .iter()
        .map(|s| (*s).to_owned())
        .chain(decisions.iter().cloned())
        .collect();
    config.simulation.turn_delay_ms = 0;
    config.simulation.max_turns = max_turns;
    config.simulation.seed = Some(42);
    config
}

/// Wait until the published view reaches an accepted phase.
///
/// Views are published after every phase change the loop makes, so the
/// returned snapshot is consistent with the phase.
async fn wait_for_phase(orchestrator: &Orchestrator, accept: impl Fn(RunPhase) -> bool) -> RunPhase {
    let mut views = orchestrator.subscribe();
    let waited = tokio::time::timeout(Duration::from_secs(10), views.wait_for(|v| accept(v.phase))).await;
    match waited {
        Ok(Ok(view)) => view.phase,
        _ => panic!("timed out waiting; phase is {}", orchestrator.phase()),
    }
}

#[tokio::test]
async fn run_plays_every_turn_then_finishes() {
    let orchestrator = Orchestrator::new(config(
        &[
            decision("collect_cash", json!({})),
            decision("view_inventory", json!({})),
            decision("get_money_balance", json!({})),
        ],
        3,
    ));
    orchestrator.start().await.unwrap();

    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Finished);
    let view = orchestrator.snapshot();
    assert_eq!(view.state.turn, 4);
    assert_eq!(view.history.len(), 3);
    assert_eq!(view.last_thought, "I will use get_money_balance.");
    assert!(view.events.iter().any(|e| e.kind == EventKind::SimulationStatus));
}

#[tokio::test]
async fn three_identical_actions_trigger_meltdown() {
    let idle = decision("idle", json!({}));
    let orchestrator = Orchestrator::new(config(&[idle.clone(), idle.clone(), idle], 10));
    orchestrator.start().await.unwrap();

    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Error);
    let view = orchestrator.snapshot();
    assert_eq!(view.state.turn, 3, "two turns complete before the halt");
    assert!(view.events.iter().any(|e| e.kind == EventKind::Meltdown));
}

#[tokio::test]
async fn two_identical_actions_do_not_trigger_meltdown() {
    let idle = decision("idle", json!({}));
    let orchestrator = Orchestrator::new(config(
        &[idle.clone(), idle, decision("collect_cash", json!({}))],
        3,
    ));
    orchestrator.start().await.unwrap();
    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Finished);
}

#[tokio::test]
async fn help_request_waits_for_operator_instruction() {
    let orchestrator = Orchestrator::new(config(
        &[
            decision("ask_for_human_help", json!({})),
            decision("collect_cash", json!({})),
        ],
        1,
    ));
    orchestrator.start().await.unwrap();

    wait_for_phase(&orchestrator, |p| p == RunPhase::AwaitingHumanInput).await;
    assert_eq!(orchestrator.snapshot().state.turn, 1, "help requests consume no turn");
    assert!(matches!(
        orchestrator.toggle_pause(),
        Err(OrchestratorError::InvalidTransition {
            from: RunPhase::AwaitingHumanInput,
            ..
        })
    ));

    let action = orchestrator
        .resume_with_human_input("please collect the cash")
        .await
        .unwrap();
    assert_eq!(action.tool, "collect_cash");

    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Finished);
    let view = orchestrator.snapshot();
    let tools: Vec<Option<String>> = view.history.iter().map(vendbench_types::Turn::tool_name).collect();
    assert_eq!(
        tools,
        vec![
            Some("ask_for_human_help".to_owned()),
            Some("collect_cash".to_owned())
        ]
    );
    assert!(view.events.iter().any(|e| e.kind == EventKind::HumanIntervention));
}

#[tokio::test]
async fn human_input_is_rejected_while_running() {
    let mut config = config(&[decision("collect_cash", json!({}))], 5);
    config.simulation.turn_delay_ms = 60_000;
    let orchestrator = Orchestrator::new(config);
    orchestrator.start().await.unwrap();

    assert!(orchestrator.resume_with_human_input("restock").await.is_err());
    orchestrator.reset().await;
}

#[tokio::test]
async fn start_is_rejected_while_a_run_is_active() {
    // No decisions queued: the backend fallback asks for help and the run waits.
    let orchestrator = Orchestrator::new(config(&[], 5));
    orchestrator.start().await.unwrap();
    wait_for_phase(&orchestrator, |p| p == RunPhase::AwaitingHumanInput).await;

    assert!(matches!(
        orchestrator.start().await,
        Err(OrchestratorError::InvalidTransition { operation: "start", .. })
    ));
    orchestrator.reset().await;
    assert_eq!(orchestrator.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn pause_toggles_between_running_and_paused() {
    let mut config = config(&[decision("collect_cash", json!({}))], 5);
    config.simulation.turn_delay_ms = 60_000;
    let orchestrator = Orchestrator::new(config);

    assert!(orchestrator.toggle_pause().is_err(), "nothing to pause while idle");
    orchestrator.start().await.unwrap();

    assert_eq!(orchestrator.toggle_pause().unwrap(), RunPhase::Paused);
    assert_eq!(orchestrator.phase(), RunPhase::Paused);
    assert_eq!(orchestrator.toggle_pause().unwrap(), RunPhase::Running);

    orchestrator.reset().await;
    assert_eq!(orchestrator.phase(), RunPhase::Idle);
}

#[tokio::test]
async fn reset_after_finish_restores_initial_state() {
    let orchestrator = Orchestrator::new(config(
        &[
            decision("set_prices", json!({"prices": [{"name": "Soda", "price": 2.5}]})),
            decision("wait_for_next_day", json!({})),
        ],
        2,
    ));
    orchestrator.start().await.unwrap();
    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Finished);
    let finished = orchestrator.snapshot();
    assert_eq!(finished.state.day, 2);
    assert_eq!(finished.state.cash_balance, dec!(498));

    orchestrator.reset().await;
    let view = orchestrator.snapshot();
    assert_eq!(view.phase, RunPhase::Idle);
    assert_eq!(view.state.turn, 1);
    assert_eq!(view.state.day, 1);
    assert_eq!(view.state.cash_balance, dec!(500));
    assert!(view.history.is_empty());
    assert!(view.events.is_empty());
}

#[tokio::test]
async fn added_turns_resume_a_finished_run() {
    let orchestrator = Orchestrator::new(config(
        &[
            decision("collect_cash", json!({})),
            decision("view_inventory", json!({})),
        ],
        1,
    ));
    orchestrator.start().await.unwrap();
    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Finished);

    assert!(orchestrator.add_turns(0).await.is_err());
    assert_eq!(orchestrator.add_turns(1).await.unwrap(), 2);

    let mut views = orchestrator.subscribe();
    let waited = tokio::time::timeout(
        Duration::from_secs(10),
        views.wait_for(|v| v.phase == RunPhase::Finished && v.state.turn == 3),
    )
    .await;
    assert!(waited.is_ok(), "run should finish again after the extra turn");
    assert_eq!(orchestrator.snapshot().history.len(), 2);
}

#[tokio::test]
async fn sent_email_gets_a_contact_reply() {
    let orchestrator = Orchestrator::new(config(
        &[
            decision(
                "send_email",
                json!({"recipient": "supplier@globalsnacks.com", "body": "Do you have chips?"}),
            ),
            "We have plenty of chips in stock.".to_owned(),
        ],
        1,
    ));
    orchestrator.start().await.unwrap();
    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Finished);

    let view = orchestrator.snapshot();
    assert_eq!(view.state.sent_emails.len(), 1);
    assert_eq!(view.state.inbox.len(), 1);
    let reply = view.state.inbox.first().unwrap();
    assert_eq!(reply.sender, "supplier@globalsnacks.com");
    assert_eq!(reply.body, "We have plenty of chips in stock.");
}

#[tokio::test]
async fn help_timeout_resumes_with_a_no_op() {
    let mut config = config(&[decision("ask_for_human_help", json!({}))], 1);
    config.safety.human_help_timeout_enabled = true;
    config.safety.human_help_timeout_secs = 1;
    let orchestrator = Orchestrator::new(config);
    orchestrator.start().await.unwrap();

    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Finished);
    let view = orchestrator.snapshot();
    assert_eq!(view.history.last().and_then(vendbench_types::Turn::tool_name).as_deref(), Some("idle"));
}

#[tokio::test]
async fn ordered_stock_arrives_through_the_loop_exactly_once() {
    let wait = decision("wait_for_next_day", json!({}));
    let mut decisions = vec![decision(
        "purchase_from_supplier",
        json!({"items": [{"name": "Soda", "quantity": 10}]}),
    )];
    // Lead times run up to five days; six waits reach the latest arrival day.
    decisions.extend(std::iter::repeat_n(wait, 6));
    let mut config = config(&decisions, 7);
    config.safety.meltdown_window = 10;
    config.safety.meltdown_repeat_threshold = 10;
    let orchestrator = Orchestrator::new(config);

    let soda = |view: &vendbench_core::SimulationView| {
        view.state.storage.item("Soda").map(|item| item.quantity)
    };
    assert_eq!(soda(&orchestrator.snapshot()), Some(50));

    orchestrator.start().await.unwrap();
    assert_eq!(wait_for_phase(&orchestrator, RunPhase::is_terminal).await, RunPhase::Finished);

    let view = orchestrator.snapshot();
    assert_eq!(view.state.day, 7);
    assert_eq!(soda(&view), Some(60));
    let deliveries: Vec<&str> = view
        .events
        .iter()
        .filter(|e| e.kind == EventKind::DeliveryReceived)
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(deliveries, vec!["Delivery arrived: 10 units of Soda."]);
    assert!(view.state.cash_balance < dec!(488), "the order and six fees were paid");

    orchestrator.reset().await;
    assert_eq!(soda(&orchestrator.snapshot()), Some(50));
}
