//! Exercises the tool server's dispatch table against an in-memory store —
//! in particular the `skip_occurrence` single-interval-advance invariant
//! (spec: `next_occurrence` always equals `calc_next(due_date, pattern,
//! interval)`) and `stop_recurrence`'s field-clearing contract.

mod support;

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;

use support::InMemoryStore;
use taskflow_core::eventbus::SidecarBus;
use taskflow_core::reminders::ReminderEngine;
use taskflow_core::store::Store;
use taskflow_core::tool_server::handlers::dispatch;

fn engine() -> ReminderEngine {
    ReminderEngine::new(Arc::new(InMemoryStore::new()), Arc::new(SidecarBus::new("http://127.0.0.1:0", "pubsub")))
}

#[tokio::test]
async fn skip_occurrence_advances_exactly_one_interval() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let due = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
    let task = store
        .create_task(
            owner,
            taskflow_core::domain::task::NewTask {
                title: "water plants".into(),
                description: None,
                priority: None,
                due_date: Some(due),
                category_ids: None,
                tag_ids: None,
                is_recurring: Some(true),
                recurrence_pattern: Some(taskflow_core::domain::task::RecurrencePattern::Weekly),
                recurrence_interval: Some(1),
            },
        )
        .await
        .unwrap();
    let first_next = task.next_occurrence.expect("recurring task has a next_occurrence");
    assert_eq!(first_next, NaiveDate::from_ymd_opt(2026, 1, 22).unwrap().and_hms_opt(9, 0, 0).unwrap());

    let reminders = engine();
    let result = dispatch(&store, &reminders, owner, "skip_occurrence", &json!({"task_id": task.id})).await;
    assert_eq!(result["status"], "updated");

    let updated = store.get_task(owner, task.id).await.unwrap();
    assert!(!updated.completed, "skip_occurrence un-completes the task");
    // due_date moves to where next_occurrence already pointed...
    assert_eq!(updated.due_date, Some(first_next));
    // ...and next_occurrence advances by exactly one more interval from there,
    // never two.
    assert_eq!(updated.next_occurrence, Some(NaiveDate::from_ymd_opt(2026, 1, 29).unwrap().and_hms_opt(9, 0, 0).unwrap()));
}

#[tokio::test]
async fn stop_recurrence_clears_pattern_and_preserves_other_state() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let due = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
    let task = store
        .create_task(
            owner,
            taskflow_core::domain::task::NewTask {
                title: "water plants".into(),
                description: None,
                priority: None,
                due_date: Some(due),
                category_ids: None,
                tag_ids: None,
                is_recurring: Some(true),
                recurrence_pattern: Some(taskflow_core::domain::task::RecurrencePattern::Daily),
                recurrence_interval: Some(2),
            },
        )
        .await
        .unwrap();

    let reminders = engine();
    let result = dispatch(&store, &reminders, owner, "stop_recurrence", &json!({"task_id": task.id})).await;
    assert_eq!(result["status"], "updated");

    let updated = store.get_task(owner, task.id).await.unwrap();
    assert!(!updated.is_recurring);
    assert!(updated.recurrence_pattern.is_none());
    assert!(updated.next_occurrence.is_none());
    assert_eq!(updated.title, "water plants");
    assert_eq!(updated.due_date, Some(due), "stop_recurrence leaves due_date untouched");
}

#[tokio::test]
async fn skip_occurrence_rejects_non_recurring_task() {
    let store = InMemoryStore::new();
    let owner = Uuid::new_v4();
    let task = store
        .create_task(
            owner,
            taskflow_core::domain::task::NewTask {
                title: "one-off".into(),
                description: None,
                priority: None,
                due_date: None,
                category_ids: None,
                tag_ids: None,
                is_recurring: None,
                recurrence_pattern: None,
                recurrence_interval: None,
            },
        )
        .await
        .unwrap();

    let reminders = engine();
    let result = dispatch(&store, &reminders, owner, "skip_occurrence", &json!({"task_id": task.id})).await;
    assert_eq!(result["status"], "error");
}
