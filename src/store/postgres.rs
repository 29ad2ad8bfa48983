//! Postgres-backed `Store` implementation.
//!
//! Uses `sqlx`'s runtime `query`/`query_as` API exclusively — never the
//! compile-time-checked `query!` macros, since no live database is
//! reachable while this code is authored (§10.4). The pool is created with
//! a small connection cap; per §5 each operation acquires and releases its
//! own connection rather than holding one across a request.

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::task::{NewTask, TaskUpdate};
use crate::domain::{
    AuditLog, Conversation, Message, Priority, RecurrencePattern, Reminder, ReminderStatus, Role, Tag, Task,
};
use crate::errors::StoreError;

use super::{NewAuditLog, SortOrder, Store, TaskListFilter, TaskSortBy, TaskStatusFilter};

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Idempotent bootstrap, not a migration framework (§10.7): just enough
    /// schema for the binaries to run against locally.
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id BIGSERIAL PRIMARY KEY,
                owner UUID NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                completed BOOLEAN NOT NULL DEFAULT FALSE,
                priority TEXT NOT NULL DEFAULT 'medium',
                due_date TIMESTAMP,
                is_recurring BOOLEAN NOT NULL DEFAULT FALSE,
                recurrence_pattern TEXT,
                recurrence_interval INT NOT NULL DEFAULT 1,
                next_occurrence TIMESTAMP,
                tag_ids BIGINT[] NOT NULL DEFAULT '{}',
                category_ids BIGINT[] NOT NULL DEFAULT '{}',
                created_at TIMESTAMP NOT NULL DEFAULT now(),
                updated_at TIMESTAMP NOT NULL DEFAULT now()
            );
            CREATE TABLE IF NOT EXISTS tags (
                id BIGSERIAL PRIMARY KEY,
                owner UUID NOT NULL,
                name TEXT NOT NULL,
                color TEXT NOT NULL,
                UNIQUE (owner, name)
            );
            CREATE TABLE IF NOT EXISTS reminders (
                id BIGSERIAL PRIMARY KEY,
                task_id BIGINT NOT NULL,
                owner UUID NOT NULL,
                remind_at TIMESTAMP NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                sent_at TIMESTAMP,
                dapr_job_name TEXT
            );
            CREATE TABLE IF NOT EXISTS conversations (
                id UUID PRIMARY KEY,
                owner UUID NOT NULL,
                title TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT now(),
                updated_at TIMESTAMP NOT NULL DEFAULT now()
            );
            CREATE TABLE IF NOT EXISTS messages (
                id BIGSERIAL PRIMARY KEY,
                conversation_id UUID NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                tool_calls JSONB,
                created_at TIMESTAMP NOT NULL DEFAULT now()
            );
            CREATE TABLE IF NOT EXISTS audit_logs (
                id BIGSERIAL PRIMARY KEY,
                actor UUID NOT NULL,
                action TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                resource_id TEXT NOT NULL,
                request_id TEXT,
                client_ip TEXT,
                user_agent TEXT,
                details JSONB NOT NULL,
                status TEXT NOT NULL,
                error_message TEXT,
                created_at TIMESTAMP NOT NULL DEFAULT now()
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_task(row: &sqlx::postgres::PgRow) -> Result<Task, StoreError> {
        let priority_str: String = row.try_get("priority")?;
        let pattern_str: Option<String> = row.try_get("recurrence_pattern")?;
        Ok(Task {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            completed: row.try_get("completed")?,
            priority: Priority::parse(&priority_str).unwrap_or(Priority::Medium),
            due_date: row.try_get("due_date")?,
            is_recurring: row.try_get("is_recurring")?,
            recurrence_pattern: pattern_str.and_then(|s| RecurrencePattern::parse(&s)),
            recurrence_interval: row.try_get("recurrence_interval")?,
            next_occurrence: row.try_get("next_occurrence")?,
            tag_ids: row.try_get("tag_ids")?,
            category_ids: row.try_get("category_ids")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_tag(row: &sqlx::postgres::PgRow) -> Result<Tag, StoreError> {
        Ok(Tag {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            name: row.try_get("name")?,
            color: row.try_get("color")?,
        })
    }

    fn row_to_reminder(row: &sqlx::postgres::PgRow) -> Result<Reminder, StoreError> {
        let status_str: String = row.try_get("status")?;
        let status = match status_str.as_str() {
            "sent" => ReminderStatus::Sent,
            "failed" => ReminderStatus::Failed,
            _ => ReminderStatus::Pending,
        };
        Ok(Reminder {
            id: row.try_get("id")?,
            task_id: row.try_get("task_id")?,
            owner: row.try_get("owner")?,
            remind_at: row.try_get("remind_at")?,
            status,
            sent_at: row.try_get("sent_at")?,
            dapr_job_name: row.try_get("dapr_job_name")?,
        })
    }

    fn row_to_conversation(row: &sqlx::postgres::PgRow) -> Result<Conversation, StoreError> {
        Ok(Conversation {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_message(row: &sqlx::postgres::PgRow) -> Result<Message, StoreError> {
        let role_str: String = row.try_get("role")?;
        let role = match role_str.as_str() {
            "assistant" => Role::Assistant,
            "system" => Role::System,
            _ => Role::User,
        };
        Ok(Message {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            role,
            content: row.try_get("content")?,
            tool_calls: row.try_get("tool_calls")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_task(&self, owner: Uuid, input: NewTask) -> Result<Task, StoreError> {
        if input.title.trim().is_empty() || input.title.chars().count() > Task::TITLE_MAX_LEN {
            return Err(StoreError::Invalid("title must be 1..=200 chars".into()));
        }
        let is_recurring = input.is_recurring.unwrap_or(false);
        if is_recurring && input.recurrence_pattern.is_none() {
            return Err(StoreError::Invalid(
                "is_recurring requires recurrence_pattern".into(),
            ));
        }
        let interval = input.recurrence_interval.unwrap_or(1);
        let next_occurrence = match (input.due_date, input.recurrence_pattern) {
            (Some(due), Some(pattern)) if is_recurring => {
                Some(crate::recurrence::calc_next(due, pattern, interval))
            }
            _ => None,
        };
        let priority = input.priority.unwrap_or(Priority::Medium);
        let row = sqlx::query(
            r#"
            INSERT INTO tasks (owner, title, description, priority, due_date, is_recurring,
                                recurrence_pattern, recurrence_interval, next_occurrence, tag_ids, category_ids)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&input.title)
        .bind(&input.description)
        .bind(priority.as_str())
        .bind(input.due_date)
        .bind(is_recurring)
        .bind(input.recurrence_pattern.map(|p| p.as_str()))
        .bind(interval)
        .bind(next_occurrence)
        .bind(input.tag_ids.unwrap_or_default())
        .bind(input.category_ids.unwrap_or_default())
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_task(&row)
    }

    async fn get_task(&self, owner: Uuid, task_id: i64) -> Result<Task, StoreError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = $1 AND owner = $2")
            .bind(task_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Self::row_to_task(&row)
    }

    async fn update_task(&self, owner: Uuid, task_id: i64, update: TaskUpdate) -> Result<Task, StoreError> {
        let current = self.get_task(owner, task_id).await?;
        let title = update.title.unwrap_or(current.title);
        let description = update.description.or(current.description);
        let priority = update.priority.unwrap_or(current.priority);
        let due_date = update.due_date.unwrap_or(current.due_date);
        let is_recurring = update.is_recurring.unwrap_or(current.is_recurring);
        let recurrence_pattern = update.recurrence_pattern.unwrap_or(current.recurrence_pattern);
        let recurrence_interval = update.recurrence_interval.unwrap_or(current.recurrence_interval);
        if is_recurring && recurrence_pattern.is_none() {
            return Err(StoreError::Invalid(
                "is_recurring requires recurrence_pattern".into(),
            ));
        }
        let next_occurrence = match (due_date, recurrence_pattern) {
            (Some(due), Some(pattern)) if is_recurring => {
                Some(crate::recurrence::calc_next(due, pattern, recurrence_interval))
            }
            _ => None,
        };
        let tag_ids = update.tag_ids.unwrap_or(current.tag_ids);
        let category_ids = update.category_ids.unwrap_or(current.category_ids);
        let completed = update.completed.unwrap_or(current.completed);
        let row = sqlx::query(
            r#"
            UPDATE tasks SET title=$1, description=$2, priority=$3, due_date=$4, is_recurring=$5,
                             recurrence_pattern=$6, recurrence_interval=$7, next_occurrence=$8,
                             tag_ids=$9, category_ids=$10, completed=$11, updated_at=now()
            WHERE id=$12 AND owner=$13
            RETURNING *
            "#,
        )
        .bind(&title)
        .bind(&description)
        .bind(priority.as_str())
        .bind(due_date)
        .bind(is_recurring)
        .bind(recurrence_pattern.map(|p| p.as_str()))
        .bind(recurrence_interval)
        .bind(next_occurrence)
        .bind(&tag_ids)
        .bind(&category_ids)
        .bind(completed)
        .bind(task_id)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_task(&row)
    }

    async fn complete_task(&self, owner: Uuid, task_id: i64) -> Result<Task, StoreError> {
        let row = sqlx::query(
            "UPDATE tasks SET completed = TRUE, updated_at = now() WHERE id = $1 AND owner = $2 RETURNING *",
        )
        .bind(task_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Self::row_to_task(&row)
    }

    async fn delete_task(&self, owner: Uuid, task_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner = $2")
            .bind(task_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_tasks(&self, owner: Uuid, filter: TaskListFilter) -> Result<Vec<Task>, StoreError> {
        let mut sql = String::from("SELECT * FROM tasks WHERE owner = $1");
        match filter.status {
            Some(TaskStatusFilter::Pending) => sql.push_str(" AND completed = FALSE"),
            Some(TaskStatusFilter::Completed) => sql.push_str(" AND completed = TRUE"),
            Some(TaskStatusFilter::All) | None => {}
        }
        if filter.priority.is_some() {
            sql.push_str(" AND priority = $2");
        }
        let sort_col = match filter.sort_by.unwrap_or(TaskSortBy::CreatedAt) {
            TaskSortBy::DueDate => "due_date",
            TaskSortBy::Priority => "priority",
            TaskSortBy::CreatedAt => "created_at",
            TaskSortBy::Title => "title",
            TaskSortBy::UpdatedAt => "updated_at",
        };
        let sort_dir = match filter.sort_order.unwrap_or(SortOrder::Desc) {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {sort_col} {sort_dir}"));

        let mut query = sqlx::query(&sql).bind(owner);
        if let Some(priority) = filter.priority {
            query = query.bind(priority.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            let task = Self::row_to_task(row)?;
            if let Some(ref needle) = filter.search {
                let needle = needle.to_lowercase();
                if !task.title.to_lowercase().contains(&needle)
                    && !task
                        .description
                        .as_deref()
                        .map(|d| d.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                {
                    continue;
                }
            }
            if let Some(ref tag_ids) = filter.tag_ids {
                if !tag_ids.iter().any(|t| task.tag_ids.contains(t)) {
                    continue;
                }
            }
            tasks.push(task);
        }
        Ok(tasks)
    }

    async fn create_tag(&self, owner: Uuid, name: &str, color: &str) -> Result<Tag, StoreError> {
        if !Tag::is_valid_color(color) {
            return Err(StoreError::Invalid("color must be #RRGGBB".into()));
        }
        let existing = sqlx::query("SELECT id FROM tags WHERE owner = $1 AND name = $2")
            .bind(owner)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(StoreError::Conflict(format!("tag '{name}' already exists")));
        }
        let row = sqlx::query("INSERT INTO tags (owner, name, color) VALUES ($1,$2,$3) RETURNING *")
            .bind(owner)
            .bind(name)
            .bind(color)
            .fetch_one(&self.pool)
            .await?;
        Self::row_to_tag(&row)
    }

    async fn list_tags(&self, owner: Uuid) -> Result<Vec<Tag>, StoreError> {
        let rows = sqlx::query("SELECT * FROM tags WHERE owner = $1 ORDER BY name")
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_tag).collect()
    }

    async fn delete_tag(&self, owner: Uuid, tag_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND owner = $2")
            .bind(tag_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        sqlx::query("UPDATE tasks SET tag_ids = array_remove(tag_ids, $1) WHERE owner = $2")
            .bind(tag_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn tag_task(&self, owner: Uuid, task_id: i64, tag_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE tasks SET tag_ids = array_append(tag_ids, $1), updated_at = now()
             WHERE id = $2 AND owner = $3 AND NOT ($1 = ANY(tag_ids))",
        )
        .bind(tag_id)
        .bind(task_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn untag_task(&self, owner: Uuid, task_id: i64, tag_id: i64) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE tasks SET tag_ids = array_remove(tag_ids, $1), updated_at = now() WHERE id = $2 AND owner = $3",
        )
        .bind(tag_id)
        .bind(task_id)
        .bind(owner)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_reminder(&self, owner: Uuid, task_id: i64, remind_at: NaiveDateTime) -> Result<Reminder, StoreError> {
        // caller (reminder engine) is responsible for the "at most one pending
        // per task" check and the past-due branch; this just inserts the row.
        let row = sqlx::query(
            "INSERT INTO reminders (task_id, owner, remind_at, status) VALUES ($1,$2,$3,'pending') RETURNING *",
        )
        .bind(task_id)
        .bind(owner)
        .bind(remind_at)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_reminder(&row)
    }

    async fn get_reminder(&self, reminder_id: i64) -> Result<Reminder, StoreError> {
        let row = sqlx::query("SELECT * FROM reminders WHERE id = $1")
            .bind(reminder_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Self::row_to_reminder(&row)
    }

    async fn list_reminders(&self, owner: Uuid) -> Result<Vec<Reminder>, StoreError> {
        let rows = sqlx::query("SELECT * FROM reminders WHERE owner = $1 ORDER BY remind_at")
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_reminder).collect()
    }

    async fn upcoming_reminders(&self, owner: Uuid, within_hours: u32) -> Result<Vec<Reminder>, StoreError> {
        if within_hours == 0 || within_hours > 168 {
            return Err(StoreError::Invalid("within_hours must be 1..=168".into()));
        }
        let horizon = Utc::now().naive_utc() + chrono::Duration::hours(within_hours as i64);
        let rows = sqlx::query(
            "SELECT * FROM reminders WHERE owner = $1 AND status = 'pending' AND remind_at <= $2 ORDER BY remind_at",
        )
        .bind(owner)
        .bind(horizon)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_reminder).collect()
    }

    async fn update_reminder_schedule(
        &self,
        owner: Uuid,
        reminder_id: i64,
        remind_at: NaiveDateTime,
    ) -> Result<Reminder, StoreError> {
        let row = sqlx::query(
            "UPDATE reminders SET remind_at = $1 WHERE id = $2 AND owner = $3 AND status = 'pending' RETURNING *",
        )
        .bind(remind_at)
        .bind(reminder_id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Self::row_to_reminder(&row)
    }

    async fn set_reminder_job(&self, reminder_id: i64, job_name: Option<String>) -> Result<(), StoreError> {
        sqlx::query("UPDATE reminders SET dapr_job_name = $1 WHERE id = $2")
            .bind(job_name)
            .bind(reminder_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_reminder(
        &self,
        reminder_id: i64,
        status: ReminderStatus,
        sent_at: Option<NaiveDateTime>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE reminders SET status = $1, sent_at = $2, dapr_job_name = NULL WHERE id = $3")
            .bind(status.as_str())
            .bind(sent_at)
            .bind(reminder_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_reminder(&self, owner: Uuid, reminder_id: i64) -> Result<Reminder, StoreError> {
        let row = sqlx::query("DELETE FROM reminders WHERE id = $1 AND owner = $2 RETURNING *")
            .bind(reminder_id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Self::row_to_reminder(&row)
    }

    async fn pending_reminder_for_task(&self, task_id: i64) -> Result<Option<Reminder>, StoreError> {
        let row = sqlx::query("SELECT * FROM reminders WHERE task_id = $1 AND status = 'pending'")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_reminder).transpose()
    }

    async fn get_or_create_conversation(
        &self,
        owner: Uuid,
        conversation_id: Option<Uuid>,
    ) -> Result<Conversation, StoreError> {
        if let Some(id) = conversation_id {
            if let Some(row) = sqlx::query("SELECT * FROM conversations WHERE id = $1 AND owner = $2")
                .bind(id)
                .bind(owner)
                .fetch_optional(&self.pool)
                .await?
            {
                return Self::row_to_conversation(&row);
            }
        }
        let id = Uuid::new_v4();
        let row = sqlx::query("INSERT INTO conversations (id, owner) VALUES ($1, $2) RETURNING *")
            .bind(id)
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Self::row_to_conversation(&row)
    }

    async fn set_conversation_title(&self, conversation_id: Uuid, title: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE conversations SET title = $1, updated_at = now() WHERE id = $2 AND title IS NULL")
            .bind(title)
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query("SELECT * FROM messages WHERE conversation_id = $1 ORDER BY id ASC")
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_message).collect()
    }

    async fn append_message(
        &self,
        conversation_id: Uuid,
        role: Role,
        content: &str,
        tool_calls: Option<Value>,
    ) -> Result<Message, StoreError> {
        let row = sqlx::query(
            "INSERT INTO messages (conversation_id, role, content, tool_calls) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .bind(tool_calls)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_message(&row)
    }

    async fn append_audit_log(&self, entry: NewAuditLog) -> Result<AuditLog, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO audit_logs (actor, action, resource_type, resource_id, request_id,
                                     client_ip, user_agent, details, status, error_message)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
            RETURNING *
            "#,
        )
        .bind(entry.actor)
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.request_id)
        .bind(&entry.client_ip)
        .bind(&entry.user_agent)
        .bind(&entry.details)
        .bind(&entry.status)
        .bind(&entry.error_message)
        .fetch_one(&self.pool)
        .await?;
        Ok(AuditLog {
            id: row.try_get("id")?,
            actor: row.try_get("actor")?,
            action: row.try_get("action")?,
            resource_type: row.try_get("resource_type")?,
            resource_id: row.try_get("resource_id")?,
            request_id: row.try_get("request_id")?,
            client_ip: row.try_get("client_ip")?,
            user_agent: row.try_get("user_agent")?,
            details: row.try_get("details")?,
            status: row.try_get("status")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
