//! Append-only audit log row, written exclusively by the audit writer consumer.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: i64,
    pub actor: Uuid,
    /// Action string, e.g. `"task.created"`, `"auth.login"`.
    pub action: String,
    pub resource_type: String,
    pub resource_id: String,
    pub request_id: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub details: Value,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}
