//! Domain types shared by every service: tasks, tags, reminders,
//! conversations, messages, audit log rows, and the event envelopes that
//! carry them across the bus.

pub mod audit;
pub mod conversation;
pub mod events;
pub mod reminder;
pub mod tag;
pub mod task;

pub use audit::AuditLog;
pub use conversation::{Conversation, Message, Role};
pub use events::{ReminderEvent, TaskEvent, TaskUpdateEvent};
pub use reminder::{Reminder, ReminderStatus};
pub use tag::Tag;
pub use task::{Priority, RecurrencePattern, Task};
