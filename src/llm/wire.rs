//! Provider wire types for the OpenAI-compatible chat-completions format
//! (adapted from the reference toolkit's `client_wrapper` primitives —
//! same shapes, trimmed to what the Gemini-backed client needs).

use serde_json::{json, Value};

/// A single tool call returned by the model in a native function-calling
/// response. The provider assigns an opaque id so the tool result can be
/// correlated back in a follow-up tool-role message.
#[derive(Debug, Clone)]
pub struct NativeToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Provider-agnostic tool schema sent alongside a chat request, serialized
/// as an OpenAI-compatible `tools` array entry.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: Value,
}

impl ToolDefinition {
    pub fn to_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters_schema,
            }
        })
    }
}

#[derive(Debug, Clone)]
pub enum WireRole {
    System,
    User,
    Assistant,
    Tool { call_id: String },
}

impl WireRole {
    fn as_str(&self) -> &'static str {
        match self {
            WireRole::System => "system",
            WireRole::User => "user",
            WireRole::Assistant => "assistant",
            WireRole::Tool { .. } => "tool",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
    pub tool_calls: Vec<NativeToolCall>,
}

impl WireMessage {
    pub fn to_json(&self) -> Value {
        let mut obj = json!({ "role": self.role.as_str(), "content": self.content });
        if let WireRole::Tool { call_id } = &self.role {
            obj["tool_call_id"] = json!(call_id);
        }
        if !self.tool_calls.is_empty() {
            obj["tool_calls"] = json!(self
                .tool_calls
                .iter()
                .map(|tc| json!({
                    "id": tc.id,
                    "type": "function",
                    "function": { "name": tc.name, "arguments": tc.arguments.to_string() },
                }))
                .collect::<Vec<_>>());
        }
        obj
    }
}

/// Token accounting from the provider's `usage`/`stream_options.include_usage`
/// field, logged for observability but not otherwise load-bearing.
#[derive(Clone, Debug, Default)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl TokenUsage {
    pub fn from_json(v: &Value) -> Option<Self> {
        let usage = v.get("usage")?;
        Some(TokenUsage {
            input_tokens: usage.get("prompt_tokens").and_then(|n| n.as_u64()).unwrap_or(0) as usize,
            output_tokens: usage.get("completion_tokens").and_then(|n| n.as_u64()).unwrap_or(0) as usize,
            total_tokens: usage.get("total_tokens").and_then(|n| n.as_u64()).unwrap_or(0) as usize,
        })
    }
}
