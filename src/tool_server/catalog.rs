//! The bounded tool catalog (§4.3). Schemas are plain JSON Schema objects,
//! the same shape `llm::gemini::GeminiAgentClient::wire_tools` forwards
//! verbatim in the OpenAI-compatible `tools` array — the tool server is the
//! single source of truth for what a tool accepts, never hard-coded a
//! second time in the dispatcher.

use serde_json::json;

use crate::llm::client::ToolCatalogEntry;

fn entry(name: &str, description: &str, parameters_schema: serde_json::Value) -> ToolCatalogEntry {
    ToolCatalogEntry {
        name: name.to_string(),
        description: description.to_string(),
        parameters_schema,
    }
}

/// The full, fixed catalog this tool server exposes (§4.3: "add_task /
/// update_task / delete_task / complete_task / list_tasks", tag CRUD,
/// reminder operations, recurring helpers).
pub fn build_catalog() -> Vec<ToolCatalogEntry> {
    vec![
        entry(
            "add_task",
            "Create a new task owned by the calling user.",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "priority": {"type": "string", "enum": ["low", "medium", "high"]},
                    "due_date": {"type": "string", "description": "ISO 8601, optional offset"},
                    "category_ids": {"type": "array", "items": {"type": "integer"}},
                    "tag_ids": {"type": "array", "items": {"type": "integer"}},
                    "is_recurring": {"type": "boolean"},
                    "recurrence_pattern": {"type": "string", "enum": ["daily", "weekly", "monthly", "yearly"]},
                    "recurrence_interval": {"type": "integer"}
                },
                "required": ["title"]
            }),
        ),
        entry(
            "update_task",
            "Update fields of an existing task owned by the calling user.",
            json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "integer"},
                    "title": {"type": "string"},
                    "description": {"type": "string"},
                    "priority": {"type": "string", "enum": ["low", "medium", "high"]},
                    "due_date": {"type": "string"},
                    "category_ids": {"type": "array", "items": {"type": "integer"}},
                    "tag_ids": {"type": "array", "items": {"type": "integer"}},
                    "is_recurring": {"type": "boolean"},
                    "recurrence_pattern": {"type": "string", "enum": ["daily", "weekly", "monthly", "yearly"]},
                    "recurrence_interval": {"type": "integer"}
                },
                "required": ["task_id"]
            }),
        ),
        entry(
            "delete_task",
            "Delete a task owned by the calling user.",
            json!({
                "type": "object",
                "properties": {"task_id": {"type": "integer"}},
                "required": ["task_id"]
            }),
        ),
        entry(
            "complete_task",
            "Mark a task owned by the calling user as completed.",
            json!({
                "type": "object",
                "properties": {"task_id": {"type": "integer"}},
                "required": ["task_id"]
            }),
        ),
        entry(
            "list_tasks",
            "List the calling user's tasks, with full tag objects embedded per task.",
            json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["all", "pending", "completed"]},
                    "priority": {"type": "string", "enum": ["low", "medium", "high"]},
                    "tag_ids": {"type": "array", "items": {"type": "integer"}},
                    "search": {"type": "string"},
                    "sort_by": {"type": "string", "enum": ["due_date", "priority", "created_at", "title", "updated_at"]},
                    "sort_order": {"type": "string", "enum": ["asc", "desc"]}
                }
            }),
        ),
        entry(
            "add_tag",
            "Create a tag for the calling user. (owner, name) must be unique; color is #RRGGBB.",
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "color": {"type": "string", "pattern": "^#[0-9A-Fa-f]{6}$"}
                },
                "required": ["name", "color"]
            }),
        ),
        entry(
            "list_tags",
            "List all tags owned by the calling user.",
            json!({"type": "object", "properties": {}}),
        ),
        entry(
            "delete_tag",
            "Delete a tag owned by the calling user, unlinking it from all tasks.",
            json!({
                "type": "object",
                "properties": {"tag_id": {"type": "integer"}},
                "required": ["tag_id"]
            }),
        ),
        entry(
            "tag_task",
            "Attach a tag to a task, both owned by the calling user.",
            json!({
                "type": "object",
                "properties": {"task_id": {"type": "integer"}, "tag_id": {"type": "integer"}},
                "required": ["task_id", "tag_id"]
            }),
        ),
        entry(
            "untag_task",
            "Remove a tag from a task, both owned by the calling user.",
            json!({
                "type": "object",
                "properties": {"task_id": {"type": "integer"}, "tag_id": {"type": "integer"}},
                "required": ["task_id", "tag_id"]
            }),
        ),
        entry(
            "schedule_reminder",
            "Schedule a reminder for a task owned by the calling user. Fires immediately if remind_at is already past.",
            json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "integer"},
                    "remind_at": {"type": "string", "description": "ISO 8601, optional offset"}
                },
                "required": ["task_id", "remind_at"]
            }),
        ),
        entry(
            "list_reminders",
            "List all reminders owned by the calling user.",
            json!({"type": "object", "properties": {}}),
        ),
        entry(
            "cancel_reminder",
            "Cancel a pending reminder owned by the calling user.",
            json!({
                "type": "object",
                "properties": {"reminder_id": {"type": "integer"}},
                "required": ["reminder_id"]
            }),
        ),
        entry(
            "get_upcoming_reminders",
            "List pending reminders due within the next `hours` hours (1..168).",
            json!({
                "type": "object",
                "properties": {"hours": {"type": "integer", "minimum": 1, "maximum": 168}},
                "required": ["hours"]
            }),
        ),
        entry(
            "list_recurring",
            "List the calling user's recurring tasks.",
            json!({"type": "object", "properties": {}}),
        ),
        entry(
            "skip_occurrence",
            "Advance a recurring task's next_occurrence by one interval and un-complete it.",
            json!({
                "type": "object",
                "properties": {"task_id": {"type": "integer"}},
                "required": ["task_id"]
            }),
        ),
        entry(
            "stop_recurrence",
            "Clear a task's recurrence fields, preserving its current state.",
            json!({
                "type": "object",
                "properties": {"task_id": {"type": "integer"}},
                "required": ["task_id"]
            }),
        ),
    ]
}
