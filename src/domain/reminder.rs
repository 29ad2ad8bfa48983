//! Reminder and its terminal state machine.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `pending -> {sent, failed}` is the only legal transition; both outcomes
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Failed,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Failed => "failed",
        }
    }
}

/// At most one pending reminder exists per task id (enforced by the store).
/// `dapr_job_name` is non-null only while an external job is live; a
/// pending reminder with `dapr_job_name = None` is "dormant" — only the
/// synchronous past-due path can still fire it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub task_id: i64,
    pub owner: Uuid,
    pub remind_at: NaiveDateTime,
    pub status: ReminderStatus,
    pub sent_at: Option<NaiveDateTime>,
    pub dapr_job_name: Option<String>,
}

impl Reminder {
    /// Invariant: `sent <=> sent_at.is_some()`.
    pub fn state_is_consistent(&self) -> bool {
        (self.status == ReminderStatus::Sent) == self.sent_at.is_some()
    }

    pub fn job_name(id: i64) -> String {
        format!("reminder-{id}")
    }
}
