//! Audit writer: subscribes `task-events`, inserts one audit row per event.
//!
//! Idempotency (§4.6, §9 open question): the source events have no
//! dedup beyond best-effort, so redelivery currently produces N audit rows
//! for N deliveries rather than one — an accepted trade-off recorded in
//! DESIGN.md. `stable_audit_id` is provided so a future unique-constraint
//! based dedup strategy has a ready-made key without changing callers.

use crate::domain::events::TaskEvent;
use crate::errors::StoreError;
use crate::store::{NewAuditLog, Store};

/// Deterministic id a future dedup pass could use as a unique constraint
/// key: `(correlation_id, event_type)`.
pub fn stable_audit_id(event: &TaskEvent) -> String {
    format!("{}:{:?}", event.correlation_id, event.event_type)
}

pub async fn handle(store: &dyn Store, event: TaskEvent) -> Result<(), StoreError> {
    let action = match event.event_type {
        crate::domain::events::TaskEventType::Created => "task.created",
        crate::domain::events::TaskEventType::Updated => "task.updated",
        crate::domain::events::TaskEventType::Completed => "task.completed",
        crate::domain::events::TaskEventType::Deleted => "task.deleted",
    };
    let details = serde_json::to_value(&event.task_data).unwrap_or(serde_json::Value::Null);
    store
        .append_audit_log(NewAuditLog {
            actor: event.user_id,
            action: action.to_string(),
            resource_type: "task".to_string(),
            resource_id: event.task_id.to_string(),
            request_id: Some(event.correlation_id.to_string()),
            client_ip: None,
            user_agent: None,
            details,
            status: "ok".to_string(),
            error_message: None,
        })
        .await?;
    Ok(())
}
