//! HTTP API surface.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::error::{StoreError, ValidationError};
use crate::runner::SleepRunner;
use crate::scheduler::Scheduler;
use crate::store::{InsertOutcome, SqliteTaskStore, TaskStore};
use crate::task::{SubmitTask, TaskStatus};
use crate::validator::{self, GraphSnapshot};

/// Shared state for the HTTP handlers.
pub struct AppState {
    pub store: Arc<SqliteTaskStore>,
    pub scheduler: Arc<Scheduler<SqliteTaskStore, SleepRunner>>,
}

/// Create the API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/tasks", post(create_task).get(list_tasks))
        .route("/api/tasks/:id", get(get_task))
        .route("/api/stats", get(stats))
        .route("/api/health", get(health))
        .with_state(state)
}

/// How request failures surface to clients.
enum ApiError {
    Validation(ValidationError),
    BadRequest(String),
    Conflict(String),
    NotFound(String),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        match e {
            // Duplicate ids are a conflict, not a malformed request.
            ValidationError::Duplicate(id) => {
                ApiError::Conflict(format!("task already exists: {id}"))
            }
            other => ApiError::Validation(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Store(e) => {
                error!(error = %e, "store failure while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal storage error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SubmitTask>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = body.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let snapshot = GraphSnapshot::load(state.store.as_ref()).await?;
    validator::validate(&input, &snapshot)?;
    let task = validator::materialize(&input, &snapshot, Utc::now().timestamp_millis());

    match state.store.insert(&task).await? {
        InsertOutcome::Inserted => {}
        // Two racing submissions can both pass the existence check; the
        // insert's uniqueness constraint is the authoritative deduplicator.
        InsertOutcome::Exists => {
            return Err(ApiError::Conflict(format!(
                "task already exists: {}",
                task.id
            )))
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Task submitted", "task": task })),
    ))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.get(&id).await? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::NotFound(format!("task not found: {id}"))),
    }
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<String>,
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = match query.status.as_deref() {
        Some(raw) => {
            let status = TaskStatus::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown status: {raw}")))?;
            state.store.list_by_status(status).await?
        }
        None => state.store.list_all().await?,
    };

    Ok(Json(json!({ "total": tasks.len(), "tasks": tasks })))
}

async fn stats(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let counts = state.store.stats().await?;

    Ok(Json(json!({
        "waiting": counts.waiting,
        "queued": counts.queued,
        "running": counts.running,
        "completed": counts.completed,
        "failed": counts.failed,
        "total": counts.total(),
        "max_concurrent_tasks": state.scheduler.max_concurrent(),
        "currently_running": state.scheduler.running_ids(),
        "slots_available": state.scheduler.slots_available(),
    })))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().timestamp_millis(),
    }))
}
