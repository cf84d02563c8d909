use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use conductor_core::analytics::{CapabilityUsage, DEFAULT_TOP_CAPABILITIES, WorkflowSummary};
use conductor_core::models::{
    CoreError, CoreErrorKind, OwnerId, TaskId, TaskRecord, WorkflowRequest,
};
use conductor_core::orchestration::OrchestrationEngine;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::identity::Caller;

/// Longest a single `GET /workflows/{id}?wait_ms=` request may hold the
/// connection open.
const MAX_WAIT: Duration = Duration::from_secs(60);

pub struct AppState {
    pub engine: OrchestrationEngine,
    pub default_owner: Option<OwnerId>,
}

impl AppState {
    pub fn new(engine: OrchestrationEngine, default_owner: Option<OwnerId>) -> Self {
        Self {
            engine,
            default_owner,
        }
    }
}

#[derive(Serialize)]
struct WorkflowEnvelope {
    workflow: TaskRecord,
}

#[derive(Serialize)]
struct WorkflowListEnvelope {
    workflows: Vec<TaskRecord>,
}

#[derive(Serialize)]
struct SummaryEnvelope {
    summary: WorkflowSummary,
}

#[derive(Serialize)]
struct CapabilitiesEnvelope {
    capabilities: Vec<CapabilityUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct WaitQuery {
    wait_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TopCapabilitiesQuery {
    limit: Option<String>,
}

impl TopCapabilitiesQuery {
    /// Anything other than a positive integer falls back to the default.
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_TOP_CAPABILITIES)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/workflows", post(submit_workflow).get(list_workflows))
        .route("/workflows/{id}", get(get_workflow))
        .route("/workflows/{id}/cancel", post(cancel_workflow))
        .route("/analytics/summary", get(workflow_summary))
        .route("/analytics/top-capabilities", get(top_capabilities));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn submit_workflow(
    State(state): State<Arc<AppState>>,
    Caller(owner): Caller,
    payload: Result<Json<WorkflowRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WorkflowEnvelope>), ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        ApiError::BadRequest(format!("Invalid request: {}", rejection.body_text()))
    })?;

    let workflow = state.engine.submit(request, owner)?;
    Ok((StatusCode::CREATED, Json(WorkflowEnvelope { workflow })))
}

async fn list_workflows(
    State(state): State<Arc<AppState>>,
    Caller(owner): Caller,
) -> Result<Json<WorkflowListEnvelope>, ApiError> {
    let workflows = state.engine.list(owner)?;
    Ok(Json(WorkflowListEnvelope { workflows }))
}

async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Caller(owner): Caller,
    Path(raw_id): Path<String>,
    Query(query): Query<WaitQuery>,
) -> Result<Json<WorkflowEnvelope>, ApiError> {
    let task_id = parse_task_id(&raw_id)?;

    let workflow = match query.wait_ms.filter(|wait_ms| *wait_ms > 0) {
        Some(wait_ms) => {
            let wait = Duration::from_millis(wait_ms).min(MAX_WAIT);
            match state
                .engine
                .wait_for_terminal(task_id, owner, Some(wait))
                .await
            {
                Err(error) if error.is_kind(CoreErrorKind::Timeout) => {
                    state.engine.get(task_id, owner)?
                }
                other => other?,
            }
        }
        None => state.engine.get(task_id, owner)?,
    };

    Ok(Json(WorkflowEnvelope { workflow }))
}

async fn cancel_workflow(
    State(state): State<Arc<AppState>>,
    Caller(owner): Caller,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task_id = parse_task_id(&raw_id)?;
    state.engine.cancel(task_id, owner)?;
    Ok(Json(json!({ "message": "Workflow cancelled successfully" })))
}

async fn workflow_summary(
    State(state): State<Arc<AppState>>,
    Caller(owner): Caller,
) -> Result<Json<SummaryEnvelope>, ApiError> {
    let summary = state.engine.summary(owner)?;
    Ok(Json(SummaryEnvelope { summary }))
}

async fn top_capabilities(
    State(state): State<Arc<AppState>>,
    Caller(owner): Caller,
    Query(query): Query<TopCapabilitiesQuery>,
) -> Result<Json<CapabilitiesEnvelope>, ApiError> {
    let capabilities = state.engine.top_capabilities(owner, query.limit())?;
    Ok(Json(CapabilitiesEnvelope { capabilities }))
}

/// Ids that cannot name a workflow are reported the same way as unknown ids.
fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    TaskId::parse(raw).map_err(|_| {
        ApiError::Core(CoreError::new(
            CoreErrorKind::NotFound,
            format!("workflow not found: {raw}"),
        ))
    })
}
