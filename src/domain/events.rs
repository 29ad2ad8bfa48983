//! Wire envelopes carried over the three topic families (§6). Every
//! envelope carries a correlation id for tracing and a timestamp; consumers
//! key idempotency on `(correlation_id, event_type, resource_id)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventType {
    #[serde(rename = "task.created")]
    Created,
    #[serde(rename = "task.updated")]
    Updated,
    #[serde(rename = "task.completed")]
    Completed,
    #[serde(rename = "task.deleted")]
    Deleted,
}

/// `task-events` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEvent {
    pub event_type: TaskEventType,
    pub task_id: i64,
    pub user_id: Uuid,
    pub task_data: TaskSnapshot,
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Minimal projection of a task at the moment an event is emitted. The
/// invariant that matters here: `title` always equals the task's title at
/// emission time, never a stale copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: String,
    pub due_date: Option<String>,
    pub tags: Vec<String>,
    pub recurring_pattern: Option<String>,
    pub next_occurrence: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderEventType {
    #[serde(rename = "reminder.scheduled")]
    Scheduled,
    #[serde(rename = "reminder.due")]
    Due,
    #[serde(rename = "reminder.cancelled")]
    Cancelled,
}

/// `reminder-events` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub event_type: ReminderEventType,
    pub reminder_id: i64,
    pub task_id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
    pub remind_at: DateTime<Utc>,
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskUpdateEventType {
    #[serde(rename = "task.sync")]
    Sync,
    #[serde(rename = "task.reminder")]
    Reminder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskUpdateAction {
    Created,
    Updated,
    Completed,
    Deleted,
    Reminder,
}

/// `task-updates` payload — the fan-out-to-clients cousin of a domain
/// event; carries only what a live UI needs.
///
/// `source_client`, per the open design question (§9), is carried in the
/// schema but never used for echo suppression: the broadcaster always
/// sends and lets the client filter (see DESIGN.md for the recorded
/// decision).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskUpdateEvent {
    pub event_type: TaskUpdateEventType,
    pub task_id: i64,
    pub user_id: Uuid,
    pub action: TaskUpdateAction,
    pub changes: Value,
    pub source_client: Option<String>,
    pub correlation_id: Uuid,
    pub timestamp: DateTime<Utc>,
}
