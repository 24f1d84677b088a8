//! Integration tests for workflow execution, suspension, and resumption
//!
//! These tests drive whole workflows end-to-end against the in-memory
//! store, a manual clock, and a recording channel capability.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::Rng;
use serde_json::{json, Value};

use axon_rs::axon::capability::{CapabilityRegistry, ConsoleChannel};
use axon_rs::axon::store::{ExecutionStore, InMemoryStore};
use axon_rs::axon::workflow::clock::ManualClock;
use axon_rs::axon::workflow::context::ExecutionContext;
use axon_rs::axon::workflow::engine::Engine;
use axon_rs::axon::workflow::execution::{ExecutionStatus, QueueItemStatus, StepOutcome};
use axon_rs::axon::workflow::loader::WorkflowLoader;
use axon_rs::axon::workflow::nodes::{pick_variant, AbVariant};
use axon_rs::axon::workflow::scheduler::QueueScheduler;

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    store: Arc<InMemoryStore>,
    clock: Arc<ManualClock>,
    channel: ConsoleChannel,
    engine: Arc<Engine>,
    scheduler: QueueScheduler,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

async fn harness(workflow_yaml: &str) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let definition = WorkflowLoader::parse_yaml(workflow_yaml).unwrap();
    store.put_definition(definition).await.unwrap();

    let clock = Arc::new(ManualClock::new(t0()));
    let channel = ConsoleChannel::new();
    let capabilities = CapabilityRegistry::new();
    capabilities.register(Arc::new(channel.clone())).await;

    let engine = Arc::new(Engine::new(store.clone(), capabilities, clock.clone()));
    let scheduler = QueueScheduler::new(store.clone(), engine.clone(), clock.clone());
    Harness {
        store,
        clock,
        channel,
        engine,
        scheduler,
    }
}

fn initial(pairs: Vec<(&str, Value)>) -> ExecutionContext {
    let mut map = HashMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    ExecutionContext::from_map(map)
}

async fn sent_messages(channel: &ConsoleChannel) -> Vec<String> {
    channel
        .sent()
        .await
        .iter()
        .map(|config| {
            config
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

// ============================================================================
// The greeting/reply scenario
// ============================================================================

const GREETING_FLOW: &str = r#"
id: greeting
name: Greeting with reply
nodes:
  - id: start
    type: trigger
  - id: greet
    type: action
    config:
      message: "Hola {{name}}, responde si o no"
  - id: ask
    type: wait_input
    config:
      output: reply
      timeout: 5
      timeoutAction: continue
  - id: check
    type: condition
    config:
      field: reply
      operator: "=="
      value: si
  - id: yes_action
    type: action
    config:
      message: "Perfecto {{name}}!"
  - id: no_action
    type: action
    config:
      message: "Entendido, hasta luego"
edges:
  - source: start
    target: greet
  - source: greet
    target: ask
  - source: ask
    target: check
  - source: check
    target: yes_action
    sourceHandle: "yes"
  - source: check
    target: no_action
    sourceHandle: "no"
"#;

#[tokio::test]
async fn reply_before_timeout_routes_to_yes_action() {
    let h = harness(GREETING_FLOW).await;

    let (execution_id, outcome) = h
        .engine
        .start("greeting", initial(vec![("name", json!("Ana"))]))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        StepOutcome::Suspended {
            resume_at: t0() + Duration::minutes(5)
        }
    );

    // Reply arrives two minutes in, ahead of the timeout
    h.clock.advance(Duration::minutes(2));
    let outcome = h.engine.deliver_reply(&execution_id, json!("si")).await.unwrap();
    assert_eq!(outcome, StepOutcome::Completed);

    let messages = sent_messages(&h.channel).await;
    assert_eq!(
        messages,
        vec!["Hola Ana, responde si o no", "Perfecto Ana!"]
    );

    let execution = h.store.load_execution(&execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn timeout_with_continue_routes_to_default_edge() {
    let h = harness(GREETING_FLOW).await;

    let (execution_id, _) = h
        .engine
        .start("greeting", initial(vec![("name", json!("Ana"))]))
        .await
        .unwrap();

    // No reply; the timeout elapses and the scheduler fires
    h.clock.advance(Duration::minutes(6));
    let report = h.scheduler.process_due().await.unwrap();
    assert_eq!(report.claimed, 1);
    assert_eq!(report.completed, 1);

    // timeoutAction: continue follows the default edge as if input had
    // arrived empty, so the condition takes its "no" branch
    let messages = sent_messages(&h.channel).await;
    assert_eq!(
        messages,
        vec!["Hola Ana, responde si o no", "Entendido, hasta luego"]
    );

    let execution = h.store.load_execution(&execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.context.get("reply"), Some(&json!("")));
}

// ============================================================================
// Chained suspension
// ============================================================================

const DOUBLE_WAIT_FLOW: &str = r#"
id: double-wait
nodes:
  - id: start
    type: trigger
  - id: first_pause
    type: wait
    config:
      duration: 10
  - id: second_pause
    type: wait
    config:
      duration: 20
  - id: done
    type: action
    config:
      message: "despertamos dos veces"
edges:
  - source: start
    target: first_pause
  - source: first_pause
    target: second_pause
  - source: second_pause
    target: done
"#;

#[tokio::test]
async fn consecutive_waits_report_suspended_again() {
    let h = harness(DOUBLE_WAIT_FLOW).await;

    let (execution_id, _) = h
        .engine
        .start("double-wait", ExecutionContext::new())
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(11));
    let report = h.scheduler.process_due().await.unwrap();
    // Suspended again, not completed and not failed
    assert_eq!(report.suspended, 1);
    assert_eq!(report.completed, 0);
    assert_eq!(report.failed, 0);

    let execution = h.store.load_execution(&execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Waiting);
    assert_eq!(execution.current_step.as_deref(), Some("second_pause"));

    h.clock.advance(Duration::minutes(21));
    let report = h.scheduler.process_due().await.unwrap();
    assert_eq!(report.completed, 1);

    assert_eq!(sent_messages(&h.channel).await, vec!["despertamos dos veces"]);
}

// ============================================================================
// Resume idempotence
// ============================================================================

#[tokio::test]
async fn resuming_a_completed_queue_item_is_a_noop() {
    let h = harness(DOUBLE_WAIT_FLOW).await;

    let (execution_id, _) = h
        .engine
        .start("double-wait", ExecutionContext::new())
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(11));
    h.scheduler.process_due().await.unwrap();
    h.clock.advance(Duration::minutes(21));
    h.scheduler.process_due().await.unwrap();

    let execution = h.store.load_execution(&execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(sent_messages(&h.channel).await.len(), 1);

    // Simulate a racing worker replaying the already-completed item
    let items = h.store.queue_items().await;
    let done = items
        .iter()
        .find(|item| item.status == QueueItemStatus::Completed)
        .unwrap();
    let outcome = h
        .engine
        .resume(&done.execution_id, &done.step_id)
        .await
        .unwrap();
    assert_eq!(outcome, StepOutcome::Completed);

    // No duplicate side effects
    assert_eq!(sent_messages(&h.channel).await.len(), 1);
}

// ============================================================================
// Buttons
// ============================================================================

const BUTTONS_FLOW: &str = r#"
id: plan-picker
nodes:
  - id: start
    type: trigger
  - id: offer
    type: buttons
    config:
      message: "Elige un plan"
      output: choice
      timeoutMinutes: 60
      buttons:
        - id: basic
          title: "Basico"
        - id: pro
          title: "Pro"
  - id: basic_action
    type: action
    config:
      message: "Plan basico activado"
  - id: pro_action
    type: action
    config:
      message: "Plan pro activado"
  - id: fallback
    type: action
    config:
      message: "Te dejamos pensarlo"
edges:
  - source: start
    target: offer
  - source: offer
    target: basic_action
    sourceHandle: basic
  - source: offer
    target: pro_action
    sourceHandle: pro
  - source: offer
    target: fallback
    sourceHandle: continue
"#;

#[tokio::test]
async fn button_choice_routes_to_matching_exit() {
    let h = harness(BUTTONS_FLOW).await;

    let (execution_id, outcome) = h
        .engine
        .start("plan-picker", ExecutionContext::new())
        .await
        .unwrap();
    assert!(matches!(outcome, StepOutcome::Suspended { .. }));
    // The interactive message went out before suspending
    assert_eq!(sent_messages(&h.channel).await, vec!["Elige un plan"]);

    let outcome = h.engine.deliver_reply(&execution_id, json!("pro")).await.unwrap();
    assert_eq!(outcome, StepOutcome::Completed);
    assert_eq!(
        sent_messages(&h.channel).await,
        vec!["Elige un plan", "Plan pro activado"]
    );
}

#[tokio::test]
async fn button_timeout_takes_continue_fallback() {
    let h = harness(BUTTONS_FLOW).await;

    let (execution_id, _) = h
        .engine
        .start("plan-picker", ExecutionContext::new())
        .await
        .unwrap();

    h.clock.advance(Duration::hours(2));
    let report = h.scheduler.process_due().await.unwrap();
    assert_eq!(report.completed, 1);

    assert_eq!(
        sent_messages(&h.channel).await,
        vec!["Elige un plan", "Te dejamos pensarlo"]
    );

    let execution = h.store.load_execution(&execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
}

// ============================================================================
// Termination on deep acyclic graphs
// ============================================================================

#[tokio::test]
async fn deep_linear_graph_terminates() {
    // 50 variable nodes in a row; the run must settle, not hang
    let mut yaml = String::from("id: deep\nnodes:\n  - id: start\n    type: trigger\n");
    for i in 0..50 {
        yaml.push_str(&format!(
            "  - id: step_{}\n    type: variable\n    config:\n      key: v{}\n      value: {}\n",
            i, i, i
        ));
    }
    yaml.push_str("edges:\n  - source: start\n    target: step_0\n");
    for i in 1..50 {
        yaml.push_str(&format!(
            "  - source: step_{}\n    target: step_{}\n",
            i - 1,
            i
        ));
    }

    let h = harness(&yaml).await;
    let (execution_id, outcome) = h.engine.start("deep", ExecutionContext::new()).await.unwrap();
    assert_eq!(outcome, StepOutcome::Completed);

    let execution = h.store.load_execution(&execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.context.get("v49"), Some(&json!(49)));
}

// ============================================================================
// A/B distribution
// ============================================================================

#[test]
fn ab_split_tracks_configured_weights() {
    let variants = vec![
        AbVariant {
            id: "a".to_string(),
            percent: 70.0,
        },
        AbVariant {
            id: "b".to_string(),
            percent: 30.0,
        },
    ];

    let mut rng = rand::thread_rng();
    let mut a_count = 0usize;
    let rounds = 10_000;
    for _ in 0..rounds {
        let roll = rng.gen_range(0.0..100.0);
        if pick_variant(&variants, roll) == Some("a") {
            a_count += 1;
        }
    }

    let share = a_count as f64 / rounds as f64;
    assert!(
        (0.65..=0.75).contains(&share),
        "expected ~70% for variant a, got {:.1}%",
        share * 100.0
    );
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn cancelled_execution_leaves_no_orphan_timer() {
    let h = harness(DOUBLE_WAIT_FLOW).await;

    let (execution_id, _) = h
        .engine
        .start("double-wait", ExecutionContext::new())
        .await
        .unwrap();

    h.engine
        .cancel(&execution_id, Some("user opted out".to_string()))
        .await
        .unwrap();

    let execution = h.store.load_execution(&execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.error.as_deref(), Some("user opted out"));

    // The scheduler finds nothing to wake, now or later
    h.clock.advance(Duration::days(2));
    let report = h.scheduler.process_due().await.unwrap();
    assert_eq!(report.claimed, 0);
}
