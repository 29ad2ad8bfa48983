//! The dispatcher's per-chat connection to the tool server (§4.3, §9
//! "scoped resources": "the per-chat tool-server session is a scoped
//! acquisition: open on agent-run entry, guaranteed close on all exits").
//!
//! `ToolServerSession` is opened once per agent run, discovers the catalog,
//! and is dropped when the run exits — success, error, or client
//! cancellation all drop it the same way, so `Drop` is where the "closed"
//! log line lives rather than a method callers could forget to call.

use std::time::Duration;
use uuid::Uuid;

use crate::errors::AgentError;
use crate::llm::client::ToolCatalogEntry;

const CALL_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ToolServerSession {
    http: reqwest::Client,
    base_url: String,
    user_id: Uuid,
    catalog: Vec<ToolCatalogEntry>,
}

impl ToolServerSession {
    /// Open a session scoped to `user_id` and discover its tool catalog.
    /// The catalog is never hard-coded on the dispatcher side (§4.1 step 3).
    pub async fn open(base_url: impl Into<String>, user_id: Uuid) -> Result<Self, AgentError> {
        let base_url = base_url.into();
        let http = reqwest::Client::new();
        let url = format!("{base_url}/tools?user_id={user_id}");
        let catalog = http
            .get(&url)
            .send()
            .await
            .map_err(|e| AgentError::ConnectionError(e.to_string()))?
            .json::<Vec<ToolCatalogEntry>>()
            .await
            .map_err(|e| AgentError::InvalidResponse(format!("malformed tool catalog: {e}")))?;
        Ok(Self { http, base_url, user_id, catalog })
    }

    pub fn catalog(&self) -> &[ToolCatalogEntry] {
        &self.catalog
    }

    /// Invoke a tool by name. The dispatcher never trusts a tool to return
    /// valid JSON (§4.1: "it only relays the opaque output string and lets
    /// the model re-interpret on the next iteration") — the full response
    /// body is returned as a string regardless of shape.
    pub async fn call(&self, tool: &str, arguments: serde_json::Value) -> Result<String, AgentError> {
        let url = format!("{}/call?user_id={}", self.base_url, self.user_id);
        let resp = self
            .http
            .post(&url)
            .timeout(CALL_TIMEOUT)
            .json(&serde_json::json!({ "tool": tool, "arguments": arguments }))
            .send()
            .await
            .map_err(|e| AgentError::ToolError { tool: tool.to_string(), detail: e.to_string() })?;

        resp.text()
            .await
            .map_err(|e| AgentError::ToolError { tool: tool.to_string(), detail: e.to_string() })
    }
}

impl Drop for ToolServerSession {
    fn drop(&mut self) {
        log::debug!("closed tool server session for user {}", self.user_id);
    }
}
