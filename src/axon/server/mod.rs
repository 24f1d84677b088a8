// SPDX-License-Identifier: MIT

//! Thin HTTP surface over the engine
//!
//! Mirrors the embedding application's API routes: register and trigger
//! workflows, inspect executions, deliver channel replies, and the
//! `POST /api/queue/process` cron route that drives the queue scheduler.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::axon::store::ExecutionStore;
use crate::axon::workflow::context::ExecutionContext;
use crate::axon::workflow::engine::Engine;
use crate::axon::workflow::execution::{ExecutionStatus, StepOutcome};
use crate::axon::workflow::graph::ValidatedGraph;
use crate::axon::workflow::scheduler::QueueScheduler;
use crate::axon::workflow::types::WorkflowDefinition;

/// Shared state behind the router
pub struct AppState {
    pub store: Arc<dyn ExecutionStore>,
    pub engine: Arc<Engine>,
    pub scheduler: Arc<QueueScheduler>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/workflows", post(register_workflow))
        .route("/api/workflows/{id}/trigger", post(trigger_workflow))
        .route("/api/executions/{id}", get(get_execution))
        .route("/api/executions/{id}/reply", post(deliver_reply))
        .route("/api/executions/{id}/cancel", post(cancel_execution))
        .route("/api/queue/process", post(process_queue))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(port: u16, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn register_workflow(
    State(state): State<Arc<AppState>>,
    Json(definition): Json<WorkflowDefinition>,
) -> Json<Value> {
    // Reject malformed graphs at the door instead of at trigger time
    if let Err(e) = ValidatedGraph::load(definition.clone()) {
        return Json(json!({"error": e.to_string()}));
    }

    let id = definition.id.clone();
    match state.store.put_definition(definition).await {
        Ok(()) => Json(json!({"id": id, "status": "registered"})),
        Err(e) => Json(json!({"error": e.to_string()})),
    }
}

async fn trigger_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(initial): Json<HashMap<String, Value>>,
) -> Json<Value> {
    match state
        .engine
        .start(&id, ExecutionContext::from_map(initial))
        .await
    {
        Ok((execution_id, outcome)) => Json(json!({
            "execution_id": execution_id,
            "status": outcome_label(&outcome),
        })),
        Err(e) => Json(json!({"error": e.to_string()})),
    }
}

async fn get_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    let execution = match state.store.load_execution(&id).await {
        Ok(execution) => execution,
        Err(e) => return Json(json!({"error": e.to_string()})),
    };

    let next_wake = match execution.status {
        ExecutionStatus::Waiting => match state.store.find_pending(&id).await {
            Ok(pending) => pending.map(|item| item.resume_at),
            Err(_) => None,
        },
        _ => None,
    };

    Json(json!({
        "id": execution.id,
        "workflow_id": execution.workflow_id,
        "status": execution.status,
        "current_step": execution.current_step,
        "error": execution.error,
        "context": execution.context.to_json(),
        "next_wake_at": next_wake,
    }))
}

#[derive(Deserialize)]
struct ReplyRequest {
    reply: Value,
}

async fn deliver_reply(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<ReplyRequest>,
) -> Json<Value> {
    match state.engine.deliver_reply(&id, payload.reply).await {
        Ok(outcome) => Json(json!({"status": outcome_label(&outcome)})),
        Err(e) => Json(json!({"error": e.to_string()})),
    }
}

#[derive(Deserialize, Default)]
struct CancelRequest {
    #[serde(default)]
    reason: Option<String>,
}

async fn cancel_execution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Option<Json<CancelRequest>>,
) -> Json<Value> {
    let reason = payload.and_then(|Json(p)| p.reason);
    match state.engine.cancel(&id, reason).await {
        Ok(()) => Json(json!({"status": "cancelled"})),
        Err(e) => Json(json!({"error": e.to_string()})),
    }
}

/// The cron route: one scheduler pass over due queue items
async fn process_queue(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.scheduler.process_due().await {
        Ok(report) => Json(serde_json::to_value(report).unwrap_or_else(|_| json!({}))),
        Err(e) => Json(json!({"error": e.to_string()})),
    }
}

fn outcome_label(outcome: &StepOutcome) -> &'static str {
    match outcome {
        StepOutcome::Completed => "completed",
        StepOutcome::Suspended { .. } => "waiting",
        StepOutcome::Failed { .. } => "failed",
    }
}
