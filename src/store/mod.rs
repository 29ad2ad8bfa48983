//! Persistence abstraction.
//!
//! `Store` names every operation the domain needs; `postgres.rs` is the
//! concrete implementation. Keeping the trait separate lets the dispatcher,
//! tool server, and consumers share one contract without pulling in
//! `sqlx` types directly, and lets tests swap in an in-memory fake.

pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::task::{NewTask, TaskUpdate};
use crate::domain::{AuditLog, Conversation, Message, Priority, Reminder, ReminderStatus, Role, Tag, Task};
use crate::errors::StoreError;

/// Filters accepted by `list_tasks` (§4.3 catalog contract).
#[derive(Debug, Clone, Default)]
pub struct TaskListFilter {
    pub status: Option<TaskStatusFilter>,
    pub priority: Option<Priority>,
    pub tag_ids: Option<Vec<i64>>,
    pub search: Option<String>,
    pub sort_by: Option<TaskSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatusFilter {
    All,
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortBy {
    DueDate,
    Priority,
    CreatedAt,
    Title,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[async_trait]
pub trait Store: Send + Sync {
    // -- tasks --
    async fn create_task(&self, owner: Uuid, input: NewTask) -> Result<Task, StoreError>;
    async fn get_task(&self, owner: Uuid, task_id: i64) -> Result<Task, StoreError>;
    async fn update_task(&self, owner: Uuid, task_id: i64, update: TaskUpdate) -> Result<Task, StoreError>;
    async fn complete_task(&self, owner: Uuid, task_id: i64) -> Result<Task, StoreError>;
    async fn delete_task(&self, owner: Uuid, task_id: i64) -> Result<(), StoreError>;
    async fn list_tasks(&self, owner: Uuid, filter: TaskListFilter) -> Result<Vec<Task>, StoreError>;

    // -- tags --
    async fn create_tag(&self, owner: Uuid, name: &str, color: &str) -> Result<Tag, StoreError>;
    async fn list_tags(&self, owner: Uuid) -> Result<Vec<Tag>, StoreError>;
    async fn delete_tag(&self, owner: Uuid, tag_id: i64) -> Result<(), StoreError>;
    async fn tag_task(&self, owner: Uuid, task_id: i64, tag_id: i64) -> Result<(), StoreError>;
    async fn untag_task(&self, owner: Uuid, task_id: i64, tag_id: i64) -> Result<(), StoreError>;

    // -- reminders --
    async fn create_reminder(&self, owner: Uuid, task_id: i64, remind_at: NaiveDateTime) -> Result<Reminder, StoreError>;
    async fn get_reminder(&self, reminder_id: i64) -> Result<Reminder, StoreError>;
    async fn list_reminders(&self, owner: Uuid) -> Result<Vec<Reminder>, StoreError>;
    async fn upcoming_reminders(&self, owner: Uuid, within_hours: u32) -> Result<Vec<Reminder>, StoreError>;
    async fn update_reminder_schedule(
        &self,
        owner: Uuid,
        reminder_id: i64,
        remind_at: NaiveDateTime,
    ) -> Result<Reminder, StoreError>;
    async fn set_reminder_job(&self, reminder_id: i64, job_name: Option<String>) -> Result<(), StoreError>;
    async fn mark_reminder(
        &self,
        reminder_id: i64,
        status: ReminderStatus,
        sent_at: Option<NaiveDateTime>,
    ) -> Result<(), StoreError>;
    async fn delete_reminder(&self, owner: Uuid, reminder_id: i64) -> Result<Reminder, StoreError>;
    async fn pending_reminder_for_task(&self, task_id: i64) -> Result<Option<Reminder>, StoreError>;

    // -- conversations & messages --
    async fn get_or_create_conversation(
        &self,
        owner: Uuid,
        conversation_id: Option<Uuid>,
    ) -> Result<Conversation, StoreError>;
    async fn set_conversation_title(&self, conversation_id: Uuid, title: &str) -> Result<(), StoreError>;
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError>;
    async fn append_message(
        &self,
        conversation_id: Uuid,
        role: Role,
        content: &str,
        tool_calls: Option<Value>,
    ) -> Result<Message, StoreError>;

    // -- audit --
    async fn append_audit_log(&self, entry: NewAuditLog) -> Result<AuditLog, StoreError>;
}

/// Fields required to append an audit row (everything but `id`/`created_at`).
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub actor: Uuid,
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub request_id: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub details: Value,
    pub status: String,
    pub error_message: Option<String>,
}
