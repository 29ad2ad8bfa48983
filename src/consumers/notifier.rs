//! Notifier: subscribes `reminder-events`. For a `due` event, builds a
//! user-facing message and republishes it as a `TaskUpdateEvent` on
//! `task-updates` so the broadcaster can fan it out. Non-`due` event types
//! are logged but not actioned (§4.6).

use chrono::Utc;
use serde_json::json;

use crate::domain::events::{TaskUpdateAction, TaskUpdateEventType};
use crate::domain::{ReminderEvent, TaskUpdateEvent};
use crate::eventbus::{SidecarBus, Topic};

/// Build the canned reminder message shown to the user. Timestamps in
/// emitted text normalize to a `Z` suffix (§6 datetime convention), not
/// `to_rfc3339`'s default `+00:00`.
pub fn due_message(title: &str, due_at: chrono::DateTime<Utc>) -> String {
    format!(
        "Reminder: '{title}' is due at {}",
        due_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    )
}

pub async fn handle(bus: &SidecarBus, event: ReminderEvent) {
    use crate::domain::events::ReminderEventType;

    if event.event_type != ReminderEventType::Due {
        log::info!(
            "notifier: ignoring non-due reminder event {:?} for reminder {}",
            event.event_type,
            event.reminder_id
        );
        return;
    }
    let due_at = event.due_at.unwrap_or(event.remind_at);
    let message = due_message(&event.title, due_at);
    let update = TaskUpdateEvent {
        event_type: TaskUpdateEventType::Reminder,
        task_id: event.task_id,
        user_id: event.user_id,
        action: TaskUpdateAction::Reminder,
        changes: json!({ "message": message }),
        source_client: None,
        correlation_id: event.correlation_id,
        timestamp: Utc::now(),
    };
    if !bus.publish(Topic::TaskUpdates, &update).await {
        log::warn!(
            "notifier: failed to publish task-updates for reminder {} (correlation {})",
            event.reminder_id,
            update.correlation_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_message_matches_canned_format() {
        let due_at = chrono::DateTime::parse_from_rfc3339("2026-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            due_message("buy milk", due_at),
            "Reminder: 'buy milk' is due at 2026-01-15T10:00:00Z"
        );
    }
}
