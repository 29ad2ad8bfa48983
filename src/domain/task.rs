//! Task and its recurrence descriptor.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Priority level of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Recurrence cadence. `every` is the interval multiplier (`every: N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrencePattern {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(RecurrencePattern::Daily),
            "weekly" => Some(RecurrencePattern::Weekly),
            "monthly" => Some(RecurrencePattern::Monthly),
            "yearly" => Some(RecurrencePattern::Yearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrencePattern::Daily => "daily",
            RecurrencePattern::Weekly => "weekly",
            RecurrencePattern::Monthly => "monthly",
            RecurrencePattern::Yearly => "yearly",
        }
    }
}

/// A user-owned task.
///
/// Invariant: `is_recurring` implies `recurrence_pattern.is_some()`.
/// `next_occurrence` is recomputed by the store layer whenever `due_date`,
/// `is_recurring`, `recurrence_pattern`, or `recurrence_interval` change —
/// see [`crate::recurrence::calc_next`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub owner: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<NaiveDateTime>,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_interval: i32,
    pub next_occurrence: Option<NaiveDateTime>,
    pub tag_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Task {
    pub const TITLE_MAX_LEN: usize = 200;
    pub const DESCRIPTION_MAX_LEN: usize = 1000;

    /// True when the task's fields obey the `is_recurring` invariant.
    pub fn recurrence_is_consistent(&self) -> bool {
        !self.is_recurring || self.recurrence_pattern.is_some()
    }
}

/// Fields accepted when creating a task (§6 REST write surface).
#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDateTime>,
    pub category_ids: Option<Vec<i64>>,
    pub tag_ids: Option<Vec<i64>>,
    pub is_recurring: Option<bool>,
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub recurrence_interval: Option<i32>,
}

/// Partial update accepted by `PATCH /api/tasks/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDateTime>>,
    pub category_ids: Option<Vec<i64>>,
    pub tag_ids: Option<Vec<i64>>,
    pub is_recurring: Option<bool>,
    /// Double `Option` so the pattern can be explicitly cleared (`Some(None)`,
    /// used by `stop_recurrence`) as distinct from "leave unchanged" (`None`).
    pub recurrence_pattern: Option<Option<RecurrencePattern>>,
    pub recurrence_interval: Option<i32>,
    /// Not part of the REST PATCH surface; set by `skip_occurrence` to
    /// un-complete a task in the same write as its due-date advance.
    pub completed: Option<bool>,
}
