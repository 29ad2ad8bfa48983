//! Reminder lifecycle: create, callback, past-due, update, delete.
//!
//! Grounded on the reference reminder service's exact transition logic:
//! past-due is `remind_at <= now`; the callback path and the synchronous
//! past-due path converge on the same publish-then-mark-state sequence.

use chrono::{NaiveDateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::events::ReminderEventType;
use crate::domain::{Reminder, ReminderEvent, ReminderStatus};
use crate::errors::StoreError;
use crate::eventbus::{SidecarBus, Topic};
use crate::store::Store;

pub struct ReminderEngine {
    store: Arc<dyn Store>,
    bus: Arc<SidecarBus>,
}

impl ReminderEngine {
    pub fn new(store: Arc<dyn Store>, bus: Arc<SidecarBus>) -> Self {
        Self { store, bus }
    }

    /// Create a reminder for `task_id`. Rejects a second pending reminder
    /// for the same task. If `remind_at <= now`, fires synchronously; else
    /// attempts to schedule an external job.
    pub async fn create(
        &self,
        owner: Uuid,
        task_id: i64,
        title: &str,
        remind_at: NaiveDateTime,
    ) -> Result<Reminder, StoreError> {
        if self.store.pending_reminder_for_task(task_id).await?.is_some() {
            return Err(StoreError::Conflict(
                "a pending reminder already exists for this task".into(),
            ));
        }
        let reminder = self.store.create_reminder(owner, task_id, remind_at).await?;
        let now = Utc::now().naive_utc();
        if remind_at <= now {
            self.fire(&reminder, title).await?;
            return self.store.get_reminder(reminder.id).await;
        }

        let job_name = Reminder::job_name(reminder.id);
        let due_time = chrono::DateTime::<Utc>::from_naive_utc_and_offset(remind_at, Utc);
        let payload = json!({ "reminder_id": reminder.id, "task_id": task_id, "user_id": owner });
        let scheduled = self.bus.schedule_job(&job_name, payload, due_time).await;
        self.store
            .set_reminder_job(reminder.id, if scheduled { Some(job_name) } else { None })
            .await?;
        self.store.get_reminder(reminder.id).await
    }

    /// Invoked by the Jobs API callback at fire time. Skips silently if the
    /// reminder was deleted since scheduling.
    pub async fn handle_callback(&self, reminder_id: i64, title: &str) -> Result<(), StoreError> {
        let reminder = match self.store.get_reminder(reminder_id).await {
            Ok(r) => r,
            Err(StoreError::NotFound) => {
                log::info!("reminder {reminder_id} callback fired but reminder was deleted, skipping");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        if reminder.status != ReminderStatus::Pending {
            log::info!("reminder {reminder_id} callback fired but status is already terminal, skipping");
            return Ok(());
        }
        self.fire(&reminder, title).await
    }

    /// Publish the due event and transition to `sent`/`failed`. Shared by
    /// the synchronous past-due path and the asynchronous callback path.
    async fn fire(&self, reminder: &Reminder, title: &str) -> Result<(), StoreError> {
        let event = ReminderEvent {
            event_type: ReminderEventType::Due,
            reminder_id: reminder.id,
            task_id: reminder.task_id,
            user_id: reminder.owner,
            title: title.to_string(),
            due_at: Some(chrono::DateTime::<Utc>::from_naive_utc_and_offset(reminder.remind_at, Utc)),
            remind_at: chrono::DateTime::<Utc>::from_naive_utc_and_offset(reminder.remind_at, Utc),
            correlation_id: Uuid::new_v4(),
            timestamp: Utc::now(),
        };
        let published = self.bus.publish(Topic::ReminderEvents, &event).await;
        let (status, sent_at) = if published {
            (ReminderStatus::Sent, Some(Utc::now().naive_utc()))
        } else {
            (ReminderStatus::Failed, None)
        };
        self.store.mark_reminder(reminder.id, status, sent_at).await
    }

    /// Update the fire time of a still-pending reminder. Best-effort
    /// cancel of the old job, best-effort schedule of the new one.
    pub async fn update(&self, owner: Uuid, reminder_id: i64, remind_at: NaiveDateTime) -> Result<Reminder, StoreError> {
        let now = Utc::now().naive_utc();
        if remind_at <= now {
            return Err(StoreError::Invalid("remind_at must be in the future for an update".into()));
        }
        let existing = self.store.get_reminder(reminder_id).await?;
        if let Some(job_name) = existing.dapr_job_name.clone() {
            self.bus.cancel_job(&job_name).await;
        }
        let updated = self.store.update_reminder_schedule(owner, reminder_id, remind_at).await?;
        let job_name = Reminder::job_name(reminder_id);
        let due_time = chrono::DateTime::<Utc>::from_naive_utc_and_offset(remind_at, Utc);
        let payload = json!({ "reminder_id": reminder_id, "task_id": updated.task_id, "user_id": owner });
        let scheduled = self.bus.schedule_job(&job_name, payload, due_time).await;
        self.store
            .set_reminder_job(reminder_id, if scheduled { Some(job_name) } else { None })
            .await?;
        self.store.get_reminder(reminder_id).await
    }

    /// Cancel the external job (best-effort) then delete the row.
    pub async fn delete(&self, owner: Uuid, reminder_id: i64) -> Result<(), StoreError> {
        let existing = self.store.get_reminder(reminder_id).await?;
        if let Some(job_name) = existing.dapr_job_name {
            self.bus.cancel_job(&job_name).await;
        }
        self.store.delete_reminder(owner, reminder_id).await?;
        Ok(())
    }
}
