//! Recurring materializer: subscribes `task-events`, filters
//! `task.completed` events carrying a recurrence pattern, computes the
//! next occurrence, and creates a fresh task via the REST write API
//! (§4.6) — not a direct store write, since the REST surface is the
//! system of record for task creation and its own handler is what emits
//! the matching `task.created`/`task.sync` pair.
//!
//! Idempotency: redelivery creates a duplicate task. This is the
//! documented trade-off in §4.6 and the recorded decision in DESIGN.md —
//! no dedup is implemented.

use serde_json::json;

use crate::domain::events::{TaskEvent, TaskEventType};
use crate::domain::task::RecurrencePattern;
use crate::recurrence::calc_next;

/// Parse the snapshot's recurrence fields and compute the payload for a
/// new task, or `None` if the event doesn't describe a completed
/// recurring task.
pub fn next_task_payload(event: &TaskEvent) -> Option<serde_json::Value> {
    if event.event_type != TaskEventType::Completed {
        return None;
    }
    let pattern_str = event.task_data.recurring_pattern.as_ref()?;
    let pattern = RecurrencePattern::parse(pattern_str)?;
    let due = event
        .task_data
        .due_date
        .as_ref()
        .and_then(|s| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .unwrap_or_else(|| chrono::Utc::now().naive_utc());
    let next_due = calc_next(due, pattern, 1);
    Some(json!({
        "title": event.task_data.title,
        "description": event.task_data.description,
        "priority": event.task_data.priority,
        "due_date": next_due.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "is_recurring": true,
        "recurrence_pattern": pattern_str,
        "tag_names": event.task_data.tags,
    }))
}

/// POST the computed payload to the REST write surface's task creation
/// endpoint, authenticating as the owning user.
pub async fn handle(http: &reqwest::Client, rest_base_url: &str, event: TaskEvent) {
    let Some(payload) = next_task_payload(&event) else {
        return;
    };
    let url = format!("{rest_base_url}/api/tasks");
    let result = http
        .post(&url)
        .header("X-User-Id", event.user_id.to_string())
        .json(&payload)
        .send()
        .await;
    match result {
        Ok(resp) if resp.status().is_success() => {
            log::info!("recurring materializer created next occurrence for task {}", event.task_id);
        }
        Ok(resp) => log::warn!("recurring materializer POST returned {}", resp.status()),
        Err(err) => log::warn!("recurring materializer POST failed: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::TaskSnapshot;
    use uuid::Uuid;

    fn sample_event(event_type: TaskEventType, pattern: Option<&str>) -> TaskEvent {
        TaskEvent {
            event_type,
            task_id: 1,
            user_id: Uuid::new_v4(),
            task_data: TaskSnapshot {
                title: "water plants".into(),
                description: None,
                completed: true,
                priority: "medium".into(),
                due_date: Some("2026-01-15T10:00:00".into()),
                tags: vec![],
                recurring_pattern: pattern.map(|s| s.to_string()),
                next_occurrence: None,
            },
            correlation_id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn ignores_non_completed_events() {
        let event = sample_event(TaskEventType::Updated, Some("weekly"));
        assert!(next_task_payload(&event).is_none());
    }

    #[test]
    fn ignores_non_recurring_completions() {
        let event = sample_event(TaskEventType::Completed, None);
        assert!(next_task_payload(&event).is_none());
    }

    #[test]
    fn computes_next_weekly_due_date() {
        let event = sample_event(TaskEventType::Completed, Some("weekly"));
        let payload = next_task_payload(&event).unwrap();
        assert_eq!(payload["due_date"], "2026-01-22T10:00:00");
        assert_eq!(payload["recurrence_pattern"], "weekly");
        assert_eq!(payload["title"], "water plants");
    }
}
