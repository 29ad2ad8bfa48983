//! A `Store` fake backed by a `Mutex<HashMap>`, used to exercise tool
//! handlers and the store-facing parts of the domain without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use taskflow_core::domain::task::{NewTask, TaskUpdate};
use taskflow_core::domain::{AuditLog, Conversation, Message, Priority, Reminder, ReminderStatus, Role, Tag, Task};
use taskflow_core::errors::StoreError;
use taskflow_core::store::{NewAuditLog, Store, TaskListFilter, TaskStatusFilter};

#[derive(Default)]
pub struct InMemoryStore {
    tasks: Mutex<HashMap<i64, Task>>,
    tags: Mutex<HashMap<i64, Tag>>,
    reminders: Mutex<HashMap<i64, Reminder>>,
    next_task_id: Mutex<i64>,
    next_tag_id: Mutex<i64>,
    next_reminder_id: Mutex<i64>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(counter: &Mutex<i64>) -> i64 {
        let mut id = counter.lock().unwrap();
        *id += 1;
        *id
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create_task(&self, owner: Uuid, input: NewTask) -> Result<Task, StoreError> {
        if input.title.trim().is_empty() || input.title.chars().count() > Task::TITLE_MAX_LEN {
            return Err(StoreError::Invalid("title must be 1..=200 chars".into()));
        }
        let is_recurring = input.is_recurring.unwrap_or(false);
        if is_recurring && input.recurrence_pattern.is_none() {
            return Err(StoreError::Invalid("is_recurring requires recurrence_pattern".into()));
        }
        let interval = input.recurrence_interval.unwrap_or(1);
        let next_occurrence = match (input.due_date, input.recurrence_pattern) {
            (Some(due), Some(pattern)) if is_recurring => Some(taskflow_core::recurrence::calc_next(due, pattern, interval)),
            _ => None,
        };
        let now = Utc::now().naive_utc();
        let id = Self::alloc(&self.next_task_id);
        let task = Task {
            id,
            owner,
            title: input.title,
            description: input.description,
            completed: false,
            priority: input.priority.unwrap_or(Priority::Medium),
            due_date: input.due_date,
            is_recurring,
            recurrence_pattern: input.recurrence_pattern,
            recurrence_interval: interval,
            next_occurrence,
            tag_ids: input.tag_ids.unwrap_or_default(),
            category_ids: input.category_ids.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().unwrap().insert(id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, owner: Uuid, task_id: i64) -> Result<Task, StoreError> {
        self.tasks
            .lock()
            .unwrap()
            .get(&task_id)
            .filter(|t| t.owner == owner)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update_task(&self, owner: Uuid, task_id: i64, update: TaskUpdate) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let current = tasks.get(&task_id).filter(|t| t.owner == owner).cloned().ok_or(StoreError::NotFound)?;
        let title = update.title.unwrap_or(current.title);
        let description = update.description.or(current.description);
        let priority = update.priority.unwrap_or(current.priority);
        let due_date = update.due_date.unwrap_or(current.due_date);
        let is_recurring = update.is_recurring.unwrap_or(current.is_recurring);
        let recurrence_pattern = update.recurrence_pattern.unwrap_or(current.recurrence_pattern);
        let recurrence_interval = update.recurrence_interval.unwrap_or(current.recurrence_interval);
        if is_recurring && recurrence_pattern.is_none() {
            return Err(StoreError::Invalid("is_recurring requires recurrence_pattern".into()));
        }
        let next_occurrence = match (due_date, recurrence_pattern) {
            (Some(due), Some(pattern)) if is_recurring => Some(taskflow_core::recurrence::calc_next(due, pattern, recurrence_interval)),
            _ => None,
        };
        let updated = Task {
            title,
            description,
            priority,
            due_date,
            is_recurring,
            recurrence_pattern,
            recurrence_interval,
            next_occurrence,
            tag_ids: update.tag_ids.unwrap_or(current.tag_ids),
            category_ids: update.category_ids.unwrap_or(current.category_ids),
            completed: update.completed.unwrap_or(current.completed),
            updated_at: Utc::now().naive_utc(),
            ..current
        };
        tasks.insert(task_id, updated.clone());
        Ok(updated)
    }

    async fn complete_task(&self, owner: Uuid, task_id: i64) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks.get_mut(&task_id).filter(|t| t.owner == owner).ok_or(StoreError::NotFound)?;
        task.completed = true;
        task.updated_at = Utc::now().naive_utc();
        Ok(task.clone())
    }

    async fn delete_task(&self, owner: Uuid, task_id: i64) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.get(&task_id).filter(|t| t.owner == owner).is_none() {
            return Err(StoreError::NotFound);
        }
        tasks.remove(&task_id);
        Ok(())
    }

    async fn list_tasks(&self, owner: Uuid, filter: TaskListFilter) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.lock().unwrap();
        let mut out: Vec<Task> = tasks
            .values()
            .filter(|t| t.owner == owner)
            .filter(|t| match filter.status {
                Some(TaskStatusFilter::Pending) => !t.completed,
                Some(TaskStatusFilter::Completed) => t.completed,
                Some(TaskStatusFilter::All) | None => true,
            })
            .filter(|t| filter.priority.map(|p| p == t.priority).unwrap_or(true))
            .cloned()
            .collect();
        out.sort_by_key(|t| t.id);
        Ok(out)
    }

    async fn create_tag(&self, owner: Uuid, name: &str, color: &str) -> Result<Tag, StoreError> {
        if !Tag::is_valid_color(color) {
            return Err(StoreError::Invalid("color must be #RRGGBB".into()));
        }
        let id = Self::alloc(&self.next_tag_id);
        let tag = Tag { id, owner, name: name.to_string(), color: color.to_string() };
        self.tags.lock().unwrap().insert(id, tag.clone());
        Ok(tag)
    }

    async fn list_tags(&self, owner: Uuid) -> Result<Vec<Tag>, StoreError> {
        Ok(self.tags.lock().unwrap().values().filter(|t| t.owner == owner).cloned().collect())
    }

    async fn delete_tag(&self, owner: Uuid, tag_id: i64) -> Result<(), StoreError> {
        let mut tags = self.tags.lock().unwrap();
        if tags.get(&tag_id).filter(|t| t.owner == owner).is_none() {
            return Err(StoreError::NotFound);
        }
        tags.remove(&tag_id);
        Ok(())
    }

    async fn tag_task(&self, owner: Uuid, task_id: i64, tag_id: i64) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks.get_mut(&task_id).filter(|t| t.owner == owner).ok_or(StoreError::NotFound)?;
        if !task.tag_ids.contains(&tag_id) {
            task.tag_ids.push(tag_id);
        }
        Ok(())
    }

    async fn untag_task(&self, owner: Uuid, task_id: i64, tag_id: i64) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks.get_mut(&task_id).filter(|t| t.owner == owner).ok_or(StoreError::NotFound)?;
        task.tag_ids.retain(|id| *id != tag_id);
        Ok(())
    }

    async fn create_reminder(&self, owner: Uuid, task_id: i64, remind_at: NaiveDateTime) -> Result<Reminder, StoreError> {
        let id = Self::alloc(&self.next_reminder_id);
        let reminder = Reminder { id, task_id, owner, remind_at, status: ReminderStatus::Pending, sent_at: None, dapr_job_name: None };
        self.reminders.lock().unwrap().insert(id, reminder.clone());
        Ok(reminder)
    }

    async fn get_reminder(&self, reminder_id: i64) -> Result<Reminder, StoreError> {
        self.reminders.lock().unwrap().get(&reminder_id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_reminders(&self, owner: Uuid) -> Result<Vec<Reminder>, StoreError> {
        Ok(self.reminders.lock().unwrap().values().filter(|r| r.owner == owner).cloned().collect())
    }

    async fn upcoming_reminders(&self, owner: Uuid, within_hours: u32) -> Result<Vec<Reminder>, StoreError> {
        let horizon = Utc::now().naive_utc() + chrono::Duration::hours(within_hours as i64);
        Ok(self
            .reminders
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.owner == owner && r.status == ReminderStatus::Pending && r.remind_at <= horizon)
            .cloned()
            .collect())
    }

    async fn update_reminder_schedule(&self, owner: Uuid, reminder_id: i64, remind_at: NaiveDateTime) -> Result<Reminder, StoreError> {
        let mut reminders = self.reminders.lock().unwrap();
        let reminder = reminders.get_mut(&reminder_id).filter(|r| r.owner == owner).ok_or(StoreError::NotFound)?;
        reminder.remind_at = remind_at;
        Ok(reminder.clone())
    }

    async fn set_reminder_job(&self, reminder_id: i64, job_name: Option<String>) -> Result<(), StoreError> {
        if let Some(reminder) = self.reminders.lock().unwrap().get_mut(&reminder_id) {
            reminder.dapr_job_name = job_name;
        }
        Ok(())
    }

    async fn mark_reminder(&self, reminder_id: i64, status: ReminderStatus, sent_at: Option<NaiveDateTime>) -> Result<(), StoreError> {
        if let Some(reminder) = self.reminders.lock().unwrap().get_mut(&reminder_id) {
            reminder.status = status;
            reminder.sent_at = sent_at;
            reminder.dapr_job_name = None;
        }
        Ok(())
    }

    async fn delete_reminder(&self, owner: Uuid, reminder_id: i64) -> Result<Reminder, StoreError> {
        let mut reminders = self.reminders.lock().unwrap();
        let reminder = reminders.get(&reminder_id).filter(|r| r.owner == owner).cloned().ok_or(StoreError::NotFound)?;
        reminders.remove(&reminder_id);
        Ok(reminder)
    }

    async fn pending_reminder_for_task(&self, task_id: i64) -> Result<Option<Reminder>, StoreError> {
        Ok(self
            .reminders
            .lock()
            .unwrap()
            .values()
            .find(|r| r.task_id == task_id && r.status == ReminderStatus::Pending)
            .cloned())
    }

    async fn get_or_create_conversation(&self, _owner: Uuid, _conversation_id: Option<Uuid>) -> Result<Conversation, StoreError> {
        unimplemented!("not exercised by the tool-handler tests")
    }

    async fn set_conversation_title(&self, _conversation_id: Uuid, _title: &str) -> Result<(), StoreError> {
        unimplemented!("not exercised by the tool-handler tests")
    }

    async fn list_messages(&self, _conversation_id: Uuid) -> Result<Vec<Message>, StoreError> {
        unimplemented!("not exercised by the tool-handler tests")
    }

    async fn append_message(&self, _conversation_id: Uuid, _role: Role, _content: &str, _tool_calls: Option<Value>) -> Result<Message, StoreError> {
        unimplemented!("not exercised by the tool-handler tests")
    }

    async fn append_audit_log(&self, _entry: NewAuditLog) -> Result<AuditLog, StoreError> {
        unimplemented!("not exercised by the tool-handler tests")
    }
}
