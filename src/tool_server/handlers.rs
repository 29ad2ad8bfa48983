//! Tool execution (§4.3 catalog contract, §7 "every tool catches unhandled
//! exceptions and returns `{status: \"error\", message: \"<generic>\"}`,
//! never propagates stack traces").
//!
//! Every handler returns a `serde_json::Value` with a `status` field drawn
//! from `{created, updated, deleted, completed, success, error}` — never a
//! `Result` that could surface an internal error type to the wire.

use chrono::{NaiveDateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::task::{NewTask, TaskUpdate};
use crate::domain::{Priority, RecurrencePattern, Tag, Task};
use crate::errors::StoreError;
use crate::recurrence::calc_next;
use crate::reminders::ReminderEngine;
use crate::store::{SortOrder, Store, TaskListFilter, TaskSortBy, TaskStatusFilter};

/// Dispatch one tool call by name. Unknown tool names and any store error
/// are reduced to the same `{status: "error", message}` shape the rest of
/// the catalog uses for validation failures (§4.3: "All input-validation
/// failures return `{status: \"error\", ...}` rather than throwing").
pub async fn dispatch(store: &dyn Store, reminders: &ReminderEngine, owner: Uuid, tool: &str, args: &Value) -> Value {
    let result = match tool {
        "add_task" => add_task(store, owner, args).await,
        "update_task" => update_task(store, owner, args).await,
        "delete_task" => delete_task(store, owner, args).await,
        "complete_task" => complete_task(store, owner, args).await,
        "list_tasks" => list_tasks(store, owner, args).await,
        "add_tag" => add_tag(store, owner, args).await,
        "list_tags" => list_tags(store, owner).await,
        "delete_tag" => delete_tag(store, owner, args).await,
        "tag_task" => tag_task(store, owner, args).await,
        "untag_task" => untag_task(store, owner, args).await,
        "schedule_reminder" => schedule_reminder(store, reminders, owner, args).await,
        "list_reminders" => list_reminders(store, owner).await,
        "cancel_reminder" => cancel_reminder(reminders, owner, args).await,
        "get_upcoming_reminders" => get_upcoming_reminders(store, owner, args).await,
        "list_recurring" => list_recurring(store, owner).await,
        "skip_occurrence" => skip_occurrence(store, owner, args).await,
        "stop_recurrence" => stop_recurrence(store, owner, args).await,
        other => Err(format!("unknown tool '{other}'")),
    };
    match result {
        Ok(value) => value,
        Err(message) => json!({"status": "error", "message": message}),
    }
}

fn store_err(err: StoreError) -> String {
    match err {
        StoreError::NotFound => "not found".to_string(),
        StoreError::Conflict(msg) => msg,
        StoreError::Invalid(msg) => msg,
        StoreError::Database(_) => "internal error, please try again".to_string(),
    }
}

fn required_str(args: &Value, field: &str) -> Result<String, String> {
    args.get(field)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| format!("missing required field '{field}'"))
}

fn required_i64(args: &Value, field: &str) -> Result<i64, String> {
    args.get(field)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| format!("missing required field '{field}'"))
}

fn optional_str(args: &Value, field: &str) -> Option<String> {
    args.get(field).and_then(|v| v.as_str()).map(str::to_string)
}

fn optional_i64_vec(args: &Value, field: &str) -> Option<Vec<i64>> {
    args.get(field)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_i64()).collect())
}

fn parse_due_date(args: &Value, field: &str) -> Result<Option<NaiveDateTime>, String> {
    match args.get(field).and_then(|v| v.as_str()) {
        None => Ok(None),
        Some(s) => parse_iso8601(s).map(Some),
    }
}

/// Parse an ISO 8601 instant with optional offset, stored as naive UTC
/// (§6 datetime convention: "inputs may include an offset ... stored as
/// naive UTC").
fn parse_iso8601(s: &str) -> Result<NaiveDateTime, String> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).naive_utc());
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map_err(|_| format!("'{s}' is not a valid ISO 8601 date"))
}

async fn tags_by_id(store: &dyn Store, owner: Uuid) -> Result<HashMap<i64, Tag>, String> {
    let tags = store.list_tags(owner).await.map_err(store_err)?;
    Ok(tags.into_iter().map(|t| (t.id, t)).collect())
}

fn task_with_tags(task: &Task, tags_by_id: &HashMap<i64, Tag>) -> Value {
    let mut value = serde_json::to_value(task).unwrap_or(Value::Null);
    let tags: Vec<Value> = task
        .tag_ids
        .iter()
        .filter_map(|id| tags_by_id.get(id))
        .map(|t| serde_json::to_value(t).unwrap_or(Value::Null))
        .collect();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("tags".to_string(), Value::Array(tags));
    }
    value
}

async fn add_task(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let priority = match args.get("priority").and_then(|v| v.as_str()) {
        Some(s) => Some(Priority::parse(s).ok_or_else(|| format!("invalid priority '{s}'"))?),
        None => None,
    };
    let recurrence_pattern = match args.get("recurrence_pattern").and_then(|v| v.as_str()) {
        Some(s) => Some(RecurrencePattern::parse(s).ok_or_else(|| format!("invalid recurrence_pattern '{s}'"))?),
        None => None,
    };
    let input = NewTask {
        title: required_str(args, "title")?,
        description: optional_str(args, "description"),
        priority,
        due_date: parse_due_date(args, "due_date")?,
        category_ids: optional_i64_vec(args, "category_ids"),
        tag_ids: optional_i64_vec(args, "tag_ids"),
        is_recurring: args.get("is_recurring").and_then(|v| v.as_bool()),
        recurrence_pattern,
        recurrence_interval: args.get("recurrence_interval").and_then(|v| v.as_i64()).map(|n| n as i32),
    };
    let task = store.create_task(owner, input).await.map_err(store_err)?;
    let tags = tags_by_id(store, owner).await?;
    Ok(json!({"status": "created", "task": task_with_tags(&task, &tags)}))
}

async fn update_task(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let task_id = required_i64(args, "task_id")?;
    let priority = match args.get("priority").and_then(|v| v.as_str()) {
        Some(s) => Some(Priority::parse(s).ok_or_else(|| format!("invalid priority '{s}'"))?),
        None => None,
    };
    let recurrence_pattern = match args.get("recurrence_pattern") {
        None => None,
        Some(Value::Null) => Some(None),
        Some(v) => {
            let s = v.as_str().ok_or_else(|| "recurrence_pattern must be a string".to_string())?;
            Some(Some(RecurrencePattern::parse(s).ok_or_else(|| format!("invalid recurrence_pattern '{s}'"))?))
        }
    };
    let update = TaskUpdate {
        title: optional_str(args, "title"),
        description: optional_str(args, "description"),
        priority,
        due_date: args.get("due_date").map(|_| parse_due_date(args, "due_date")).transpose()?,
        category_ids: optional_i64_vec(args, "category_ids"),
        tag_ids: optional_i64_vec(args, "tag_ids"),
        is_recurring: args.get("is_recurring").and_then(|v| v.as_bool()),
        recurrence_pattern,
        recurrence_interval: args.get("recurrence_interval").and_then(|v| v.as_i64()).map(|n| n as i32),
        completed: None,
    };
    let task = store.update_task(owner, task_id, update).await.map_err(store_err)?;
    let tags = tags_by_id(store, owner).await?;
    Ok(json!({"status": "updated", "task": task_with_tags(&task, &tags)}))
}

async fn delete_task(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let task_id = required_i64(args, "task_id")?;
    store.delete_task(owner, task_id).await.map_err(store_err)?;
    Ok(json!({"status": "deleted", "task_id": task_id}))
}

async fn complete_task(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let task_id = required_i64(args, "task_id")?;
    let task = store.complete_task(owner, task_id).await.map_err(store_err)?;
    let tags = tags_by_id(store, owner).await?;
    Ok(json!({"status": "completed", "task": task_with_tags(&task, &tags)}))
}

async fn list_tasks(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let status = match args.get("status").and_then(|v| v.as_str()) {
        Some("pending") => Some(TaskStatusFilter::Pending),
        Some("completed") => Some(TaskStatusFilter::Completed),
        Some("all") | None => Some(TaskStatusFilter::All),
        Some(other) => return Err(format!("invalid status '{other}'")),
    };
    let priority = match args.get("priority").and_then(|v| v.as_str()) {
        Some(s) => Some(Priority::parse(s).ok_or_else(|| format!("invalid priority '{s}'"))?),
        None => None,
    };
    let sort_by = match args.get("sort_by").and_then(|v| v.as_str()) {
        Some("due_date") => Some(TaskSortBy::DueDate),
        Some("priority") => Some(TaskSortBy::Priority),
        Some("created_at") => Some(TaskSortBy::CreatedAt),
        Some("title") => Some(TaskSortBy::Title),
        Some("updated_at") => Some(TaskSortBy::UpdatedAt),
        None => None,
        Some(other) => return Err(format!("invalid sort_by '{other}'")),
    };
    let sort_order = match args.get("sort_order").and_then(|v| v.as_str()) {
        Some("asc") => Some(SortOrder::Asc),
        Some("desc") => Some(SortOrder::Desc),
        None => None,
        Some(other) => return Err(format!("invalid sort_order '{other}'")),
    };
    let filter = TaskListFilter {
        status,
        priority,
        tag_ids: optional_i64_vec(args, "tag_ids"),
        search: optional_str(args, "search"),
        sort_by,
        sort_order,
    };
    let tasks = store.list_tasks(owner, filter).await.map_err(store_err)?;
    let tags = tags_by_id(store, owner).await?;
    let tasks: Vec<Value> = tasks.iter().map(|t| task_with_tags(t, &tags)).collect();
    Ok(json!({"status": "success", "tasks": tasks}))
}

async fn add_tag(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let name = required_str(args, "name")?;
    let color = required_str(args, "color")?;
    let tag = store.create_tag(owner, &name, &color).await.map_err(store_err)?;
    Ok(json!({"status": "created", "tag": tag}))
}

async fn list_tags(store: &dyn Store, owner: Uuid) -> Result<Value, String> {
    let tags = store.list_tags(owner).await.map_err(store_err)?;
    Ok(json!({"status": "success", "tags": tags}))
}

async fn delete_tag(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let tag_id = required_i64(args, "tag_id")?;
    store.delete_tag(owner, tag_id).await.map_err(store_err)?;
    Ok(json!({"status": "deleted", "tag_id": tag_id}))
}

async fn tag_task(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let task_id = required_i64(args, "task_id")?;
    let tag_id = required_i64(args, "tag_id")?;
    store.tag_task(owner, task_id, tag_id).await.map_err(store_err)?;
    Ok(json!({"status": "updated", "task_id": task_id, "tag_id": tag_id}))
}

async fn untag_task(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let task_id = required_i64(args, "task_id")?;
    let tag_id = required_i64(args, "tag_id")?;
    store.untag_task(owner, task_id, tag_id).await.map_err(store_err)?;
    Ok(json!({"status": "updated", "task_id": task_id, "tag_id": tag_id}))
}

async fn schedule_reminder(store: &dyn Store, reminders: &ReminderEngine, owner: Uuid, args: &Value) -> Result<Value, String> {
    let task_id = required_i64(args, "task_id")?;
    let remind_at = parse_iso8601(&required_str(args, "remind_at")?)?;
    let task = store.get_task(owner, task_id).await.map_err(store_err)?;
    let reminder = reminders
        .create(owner, task_id, &task.title, remind_at)
        .await
        .map_err(store_err)?;
    Ok(json!({"status": "created", "reminder": reminder}))
}

async fn list_reminders(store: &dyn Store, owner: Uuid) -> Result<Value, String> {
    let reminders = store.list_reminders(owner).await.map_err(store_err)?;
    Ok(json!({"status": "success", "reminders": reminders}))
}

async fn cancel_reminder(reminders: &ReminderEngine, owner: Uuid, args: &Value) -> Result<Value, String> {
    let reminder_id = required_i64(args, "reminder_id")?;
    reminders.delete(owner, reminder_id).await.map_err(store_err)?;
    Ok(json!({"status": "deleted", "reminder_id": reminder_id}))
}

async fn get_upcoming_reminders(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let hours = args
        .get("hours")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| "missing required field 'hours'".to_string())?;
    let reminders = store
        .upcoming_reminders(owner, hours as u32)
        .await
        .map_err(store_err)?;
    Ok(json!({"status": "success", "reminders": reminders}))
}

async fn list_recurring(store: &dyn Store, owner: Uuid) -> Result<Value, String> {
    let tasks = store
        .list_tasks(owner, TaskListFilter::default())
        .await
        .map_err(store_err)?;
    let tags = tags_by_id(store, owner).await?;
    let recurring: Vec<Value> = tasks
        .iter()
        .filter(|t| t.is_recurring)
        .map(|t| task_with_tags(t, &tags))
        .collect();
    Ok(json!({"status": "success", "tasks": recurring}))
}

/// Advance `next_occurrence` by one interval and un-complete the task
/// (§4.3: "skip_occurrence advances next_occurrence by one interval and
/// un-completes the task").
async fn skip_occurrence(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let task_id = required_i64(args, "task_id")?;
    let task = store.get_task(owner, task_id).await.map_err(store_err)?;
    let pattern = task
        .recurrence_pattern
        .ok_or_else(|| "task is not recurring".to_string())?;
    // `next_occurrence` is always `calc_next(due_date, ...)` (recomputed by the
    // store on every update), so advancing it by one interval means moving
    // `due_date` to where `next_occurrence` already points — not calling
    // `calc_next` a second time here, which would skip two occurrences.
    let new_due = task
        .next_occurrence
        .unwrap_or_else(|| calc_next(task.due_date.unwrap_or_else(|| Utc::now().naive_utc()), pattern, task.recurrence_interval));
    let update = TaskUpdate {
        due_date: Some(Some(new_due)),
        completed: Some(false),
        ..Default::default()
    };
    let updated = store.update_task(owner, task_id, update).await.map_err(store_err)?;
    Ok(json!({"status": "updated", "task": updated}))
}

/// Clear recurrence fields, preserving task state otherwise (§4.3:
/// "stop_recurrence clears recurrence fields, preserving task state").
async fn stop_recurrence(store: &dyn Store, owner: Uuid, args: &Value) -> Result<Value, String> {
    let task_id = required_i64(args, "task_id")?;
    let update = TaskUpdate {
        is_recurring: Some(false),
        recurrence_pattern: Some(None),
        recurrence_interval: Some(1),
        ..Default::default()
    };
    let task = store.update_task(owner, task_id, update).await.map_err(store_err)?;
    Ok(json!({"status": "updated", "task": task}))
}
