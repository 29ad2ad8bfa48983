//! `POST /api/tasks`, `PATCH /api/tasks/{id}`, `PATCH /api/tasks/{id}/complete`,
//! `DELETE /api/tasks/{id}` (§6). Every successful write publishes the
//! matching `task-events` domain event and `task-updates` client-fan-out
//! event (§6 payload tables) — this is the producer side the rest of the
//! core only consumes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, patch, post};
use axum::Router;
use chrono::{NaiveDateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::JwksCache;
use crate::domain::events::{TaskEvent, TaskEventType, TaskSnapshot, TaskUpdateAction, TaskUpdateEvent, TaskUpdateEventType};
use crate::domain::task::{NewTask, Priority, RecurrencePattern, TaskUpdate};
use crate::domain::{Tag, Task};
use crate::errors::StoreError;
use crate::eventbus::{SidecarBus, Topic};
use crate::store::Store;

#[derive(Clone)]
pub struct RestWriterState {
    pub store: Arc<dyn Store>,
    pub bus: Arc<SidecarBus>,
    pub jwks: Arc<JwksCache>,
}

pub fn rest_writer_router(state: RestWriterState) -> Router {
    Router::new()
        .route("/api/tasks", post(create_task))
        .route("/api/tasks/{id}", patch(update_task).delete(delete_task))
        .route("/api/tasks/{id}/complete", patch(complete_task))
        .with_state(state)
}

#[derive(serde::Serialize)]
struct ErrorBody {
    message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, Json(ErrorBody { message: message.into() })).into_response()
}

/// Resolve the acting user: a verified bearer token takes priority (§6
/// Auth); a `X-User-Id` header is accepted as the trusted path for
/// service-to-service callers like the recurring materializer, which
/// authenticates to the sidecar rather than to this service directly.
async fn resolve_owner(state: &RestWriterState, headers: &HeaderMap) -> Result<Uuid, axum::response::Response> {
    if let Some(token) = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        return state
            .jwks
            .verify(token)
            .await
            .map_err(|_| error_response(StatusCode::UNAUTHORIZED, "invalid bearer token"));
    }
    headers
        .get("X-User-Id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "missing credentials"))
}

fn store_err_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => error_response(StatusCode::NOT_FOUND, "not found"),
        StoreError::Conflict(msg) => error_response(StatusCode::CONFLICT, msg),
        StoreError::Invalid(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        StoreError::Database(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error, please try again"),
    }
}

fn parse_iso8601(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").map_err(|_| format!("'{s}' is not a valid ISO 8601 date"))
}

fn parse_due_date(body: &Value, field: &str) -> Result<Option<NaiveDateTime>, String> {
    match body.get(field).and_then(|v| v.as_str()) {
        None => Ok(None),
        Some(s) => parse_iso8601(s).map(Some),
    }
}

fn parse_i64_vec(body: &Value, field: &str) -> Option<Vec<i64>> {
    body.get(field).and_then(|v| v.as_array()).map(|arr| arr.iter().filter_map(|v| v.as_i64()).collect())
}

fn new_task_from_body(body: &Value) -> Result<NewTask, String> {
    let title = body
        .get("title")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "missing required field 'title'".to_string())?
        .to_string();
    let priority = match body.get("priority").and_then(|v| v.as_str()) {
        Some(s) => Some(Priority::parse(s).ok_or_else(|| format!("invalid priority '{s}'"))?),
        None => None,
    };
    let recurrence_pattern = match body.get("recurrence_pattern").and_then(|v| v.as_str()) {
        Some(s) => Some(RecurrencePattern::parse(s).ok_or_else(|| format!("invalid recurrence_pattern '{s}'"))?),
        None => None,
    };
    Ok(NewTask {
        title,
        description: body.get("description").and_then(|v| v.as_str()).map(str::to_string),
        priority,
        due_date: parse_due_date(body, "due_date")?,
        category_ids: parse_i64_vec(body, "category_ids"),
        tag_ids: parse_i64_vec(body, "tag_ids"),
        is_recurring: body.get("is_recurring").and_then(|v| v.as_bool()),
        recurrence_pattern,
        recurrence_interval: body.get("recurrence_interval").and_then(|v| v.as_i64()).map(|n| n as i32),
    })
}

fn task_update_from_body(body: &Value) -> Result<TaskUpdate, String> {
    let priority = match body.get("priority").and_then(|v| v.as_str()) {
        Some(s) => Some(Priority::parse(s).ok_or_else(|| format!("invalid priority '{s}'"))?),
        None => None,
    };
    let recurrence_pattern = match body.get("recurrence_pattern") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(v) => {
            let s = v.as_str().ok_or_else(|| "recurrence_pattern must be a string".to_string())?;
            Some(Some(RecurrencePattern::parse(s).ok_or_else(|| format!("invalid recurrence_pattern '{s}'"))?))
        }
    };
    Ok(TaskUpdate {
        title: body.get("title").and_then(|v| v.as_str()).map(str::to_string),
        description: body.get("description").and_then(|v| v.as_str()).map(str::to_string),
        priority,
        due_date: body.get("due_date").map(|_| parse_due_date(body, "due_date")).transpose()?,
        category_ids: parse_i64_vec(body, "category_ids"),
        tag_ids: parse_i64_vec(body, "tag_ids"),
        is_recurring: body.get("is_recurring").and_then(|v| v.as_bool()),
        recurrence_pattern,
        recurrence_interval: body.get("recurrence_interval").and_then(|v| v.as_i64()).map(|n| n as i32),
        completed: None,
    })
}

async fn tag_names(store: &dyn Store, owner: Uuid, tag_ids: &[i64]) -> Vec<String> {
    let tags: HashMap<i64, Tag> = store.list_tags(owner).await.unwrap_or_default().into_iter().map(|t| (t.id, t)).collect();
    tag_ids.iter().filter_map(|id| tags.get(id)).map(|t| t.name.clone()).collect()
}

/// Resolve a `tag_names` array (as carried by the recurring materializer's
/// create payload, which only has the prior task's tag *names* from its
/// snapshot, not ids) against the owner's existing tags. Names with no
/// matching tag are dropped rather than auto-created.
async fn resolve_tag_names(store: &dyn Store, owner: Uuid, body: &Value) -> Vec<i64> {
    let Some(names) = body.get("tag_names").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    let names: Vec<&str> = names.iter().filter_map(|v| v.as_str()).collect();
    let tags = store.list_tags(owner).await.unwrap_or_default();
    names
        .iter()
        .filter_map(|name| tags.iter().find(|t| t.name == *name).map(|t| t.id))
        .collect()
}

async fn snapshot(store: &dyn Store, task: &Task) -> TaskSnapshot {
    TaskSnapshot {
        title: task.title.clone(),
        description: task.description.clone(),
        completed: task.completed,
        priority: task.priority.as_str().to_string(),
        due_date: task.due_date.map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string()),
        tags: tag_names(store, task.owner, &task.tag_ids).await,
        recurring_pattern: task.recurrence_pattern.map(|p| p.as_str().to_string()),
        next_occurrence: task.next_occurrence.map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }
}

async fn publish_task_event(bus: &SidecarBus, event_type: TaskEventType, task: &Task, task_data: TaskSnapshot) {
    let correlation_id = Uuid::new_v4();
    let event = TaskEvent {
        event_type,
        task_id: task.id,
        user_id: task.owner,
        task_data,
        correlation_id,
        timestamp: Utc::now(),
    };
    if !bus.publish(Topic::TaskEvents, &event).await {
        log::warn!("rest_writer: failed to publish task-events for task {}", task.id);
    }

    let (update_type, action) = match event_type {
        TaskEventType::Created => (TaskUpdateEventType::Sync, TaskUpdateAction::Created),
        TaskEventType::Updated => (TaskUpdateEventType::Sync, TaskUpdateAction::Updated),
        TaskEventType::Completed => (TaskUpdateEventType::Sync, TaskUpdateAction::Completed),
        TaskEventType::Deleted => (TaskUpdateEventType::Sync, TaskUpdateAction::Deleted),
    };
    let update = TaskUpdateEvent {
        event_type: update_type,
        task_id: task.id,
        user_id: task.owner,
        action,
        changes: json!({}),
        source_client: None,
        correlation_id,
        timestamp: Utc::now(),
    };
    if !bus.publish(Topic::TaskUpdates, &update).await {
        log::warn!("rest_writer: failed to publish task-updates for task {}", task.id);
    }
}

async fn create_task(State(state): State<RestWriterState>, headers: HeaderMap, Json(body): Json<Value>) -> axum::response::Response {
    let owner = match resolve_owner(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    let mut input = match new_task_from_body(&body) {
        Ok(input) => input,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let resolved_by_name = resolve_tag_names(state.store.as_ref(), owner, &body).await;
    if !resolved_by_name.is_empty() {
        let mut tag_ids = input.tag_ids.unwrap_or_default();
        tag_ids.extend(resolved_by_name);
        input.tag_ids = Some(tag_ids);
    }
    let task = match state.store.create_task(owner, input).await {
        Ok(task) => task,
        Err(err) => return store_err_response(err),
    };
    let snap = snapshot(state.store.as_ref(), &task).await;
    publish_task_event(&state.bus, TaskEventType::Created, &task, snap).await;
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn update_task(
    State(state): State<RestWriterState>,
    headers: HeaderMap,
    Path(task_id): Path<i64>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let owner = match resolve_owner(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    let update = match task_update_from_body(&body) {
        Ok(update) => update,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let task = match state.store.update_task(owner, task_id, update).await {
        Ok(task) => task,
        Err(err) => return store_err_response(err),
    };
    let snap = snapshot(state.store.as_ref(), &task).await;
    publish_task_event(&state.bus, TaskEventType::Updated, &task, snap).await;
    Json(task).into_response()
}

async fn complete_task(
    State(state): State<RestWriterState>,
    headers: HeaderMap,
    Path(task_id): Path<i64>,
) -> axum::response::Response {
    let owner = match resolve_owner(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    let task = match state.store.complete_task(owner, task_id).await {
        Ok(task) => task,
        Err(err) => return store_err_response(err),
    };
    let snap = snapshot(state.store.as_ref(), &task).await;
    publish_task_event(&state.bus, TaskEventType::Completed, &task, snap).await;
    Json(task).into_response()
}

async fn delete_task(
    State(state): State<RestWriterState>,
    headers: HeaderMap,
    Path(task_id): Path<i64>,
) -> axum::response::Response {
    let owner = match resolve_owner(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    let task = match state.store.get_task(owner, task_id).await {
        Ok(task) => task,
        Err(err) => return store_err_response(err),
    };
    if let Err(err) = state.store.delete_task(owner, task_id).await {
        return store_err_response(err);
    }
    let snap = snapshot(state.store.as_ref(), &task).await;
    publish_task_event(&state.bus, TaskEventType::Deleted, &task, snap).await;
    StatusCode::NO_CONTENT.into_response()
}
