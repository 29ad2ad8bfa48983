//! The SSE event vocabulary (§4.1, §6): `thinking | token | tool_call |
//! tool_result | agent_updated | done | error`. Modeled as a finite,
//! non-restartable sequence with a terminal `Done`/`Error` (§9: "async
//! generator streaming" note) — the agent loop never reorders these, it
//! only classifies and forwards what the model produced.

use axum::response::sse::Event;
use serde_json::json;
use uuid::Uuid;

use crate::errors::ErrorCode;

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Thinking { content: String, agent: String },
    Token { content: String },
    ToolCall { tool: String, args: serde_json::Value, call_id: String },
    ToolResult { call_id: String, output: String },
    AgentUpdated { agent: String, content: String },
    Done { conversation_id: Uuid, message_id: i64 },
    Error { message: String, code: ErrorCode },
}

impl StreamEvent {
    /// Whether this frame ends the stream (§4.1: "Terminal event is always
    /// `done` or `error`").
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }

    /// Render this frame as the named SSE event + JSON payload (§6 table).
    pub fn into_sse_event(self) -> Event {
        match self {
            StreamEvent::Thinking { content, agent } => {
                Event::default().event("thinking").json_data(json!({"content": content, "agent": agent}))
            }
            StreamEvent::Token { content } => {
                Event::default().event("token").json_data(json!({"content": content}))
            }
            StreamEvent::ToolCall { tool, args, call_id } => Event::default()
                .event("tool_call")
                .json_data(json!({"tool": tool, "args": args, "call_id": call_id})),
            StreamEvent::ToolResult { call_id, output } => {
                Event::default().event("tool_result").json_data(json!({"call_id": call_id, "output": output}))
            }
            StreamEvent::AgentUpdated { agent, content } => {
                Event::default().event("agent_updated").json_data(json!({"agent": agent, "content": content}))
            }
            StreamEvent::Done { conversation_id, message_id } => Event::default()
                .event("done")
                .json_data(json!({"conversation_id": conversation_id, "message_id": message_id})),
            StreamEvent::Error { message, code } => Event::default()
                .event("error")
                .json_data(json!({"message": message, "code": code.as_str()})),
        }
        .unwrap_or_else(|_| Event::default().event("error").data("failed to encode event"))
    }
}
