//! Integration-level checks on domain invariants that don't need a database:
//! the `TaskUpdate` double-`Option` convention and the recurrence
//! consistency invariant.

use taskflow_core::domain::task::{Priority, RecurrencePattern, Task, TaskUpdate};
use uuid::Uuid;

fn sample_task() -> Task {
    let now = chrono::Utc::now().naive_utc();
    Task {
        id: 1,
        owner: Uuid::new_v4(),
        title: "water plants".to_string(),
        description: None,
        completed: false,
        priority: Priority::Medium,
        due_date: Some(now),
        is_recurring: true,
        recurrence_pattern: Some(RecurrencePattern::Weekly),
        recurrence_interval: 1,
        next_occurrence: Some(now),
        tag_ids: vec![],
        category_ids: vec![],
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn recurring_task_without_pattern_is_inconsistent() {
    let mut task = sample_task();
    task.recurrence_pattern = None;
    assert!(!task.recurrence_is_consistent());
}

#[test]
fn non_recurring_task_without_pattern_is_consistent() {
    let mut task = sample_task();
    task.is_recurring = false;
    task.recurrence_pattern = None;
    assert!(task.recurrence_is_consistent());
}

#[test]
fn task_update_default_leaves_every_field_unset() {
    let update = TaskUpdate::default();
    assert!(update.title.is_none());
    assert!(update.due_date.is_none());
    assert!(update.recurrence_pattern.is_none());
    assert!(update.completed.is_none());
}

#[test]
fn task_update_can_explicitly_clear_due_date_and_recurrence() {
    let update = TaskUpdate { due_date: Some(None), recurrence_pattern: Some(None), ..Default::default() };
    assert_eq!(update.due_date, Some(None));
    assert_eq!(update.recurrence_pattern, Some(None));
}
