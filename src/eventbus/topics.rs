//! The three logical topic families (§1, §6).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    TaskEvents,
    ReminderEvents,
    TaskUpdates,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::TaskEvents => "task-events",
            Topic::ReminderEvents => "reminder-events",
            Topic::TaskUpdates => "task-updates",
        }
    }
}
