//! The agent loop (§4.1): the single state machine driving both the
//! non-streaming and streaming `/chat` handlers.
//!
//! `run` always returns through the same `events` channel regardless of
//! whether the caller wants the frames forwarded live (SSE) or drained into
//! one response (`routes::chat`) — the loop itself has no notion of which.

use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::conversation::{is_valid_message_len, Message as DomainMessage, Role};
use crate::errors::AgentError;
use crate::llm::client::{AgentStreamEvent, LlmClient};
use crate::store::Store;
use crate::tool_client::ToolServerSession;

use super::sse::StreamEvent;
use super::title::derive_title;

/// Shared, long-lived dependencies the loop needs on every run. One instance
/// is built at `src/bin/dispatcher.rs` startup and handed to every request.
pub struct DispatcherContext {
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn LlmClient>,
    pub jwks: Arc<crate::auth::JwksCache>,
    pub tool_server_url: String,
    pub system_prompt: String,
    pub max_tool_iterations: u32,
}

pub struct ChatRequest {
    pub owner: Uuid,
    pub conversation_id: Option<Uuid>,
    pub message: String,
}

pub struct ChatResult {
    pub conversation_id: Uuid,
    pub message_id: i64,
    pub response: String,
    pub tool_calls: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum DispatcherError {
    InvalidMessageLength,
    Agent(AgentError),
    Cancelled,
}

impl From<AgentError> for DispatcherError {
    fn from(err: AgentError) -> Self {
        DispatcherError::Agent(err)
    }
}

/// Drive one chat turn to completion, emitting `StreamEvent`s as they're
/// produced. Returns the persisted assistant message on success; on
/// failure an `error` frame has already been sent and the error is also
/// returned so the non-streaming handler can map it to an HTTP status.
pub async fn run(
    ctx: &DispatcherContext,
    req: ChatRequest,
    events: mpsc::UnboundedSender<StreamEvent>,
) -> Result<ChatResult, DispatcherError> {
    if !is_valid_message_len(&req.message) {
        return Err(DispatcherError::InvalidMessageLength);
    }

    let emit_err = |events: &mpsc::UnboundedSender<StreamEvent>, err: AgentError| {
        let _ = events.send(StreamEvent::Error { message: err.user_message().to_string(), code: err.code() });
        err
    };

    let conversation = ctx
        .store
        .get_or_create_conversation(req.owner, req.conversation_id)
        .await
        .map_err(|e| emit_err(&events, AgentError::Unknown(e.to_string())))?;

    let prior_messages = ctx
        .store
        .list_messages(conversation.id)
        .await
        .map_err(|e| emit_err(&events, AgentError::Unknown(e.to_string())))?;

    let is_first_message = prior_messages.is_empty() && conversation.title.is_none();

    let user_message = ctx
        .store
        .append_message(conversation.id, Role::User, &req.message, None)
        .await
        .map_err(|e| emit_err(&events, AgentError::Unknown(e.to_string())))?;

    if is_first_message {
        let title = derive_title(&req.message);
        // Best-effort: a title write failure shouldn't abort an otherwise
        // healthy chat turn.
        if let Err(e) = ctx.store.set_conversation_title(conversation.id, &title).await {
            log::warn!("failed to set conversation title for {}: {e}", conversation.id);
        }
    }

    let _ = events.send(StreamEvent::Thinking {
        content: "Working on your request…".to_string(),
        agent: "assistant".to_string(),
    });

    let tool_session = ToolServerSession::open(&ctx.tool_server_url, req.owner)
        .await
        .map_err(|e| emit_err(&events, e))?;

    let mut context: Vec<DomainMessage> = prior_messages;
    context.push(user_message);

    let mut full_response = String::new();
    let mut last_message_output: Option<String> = None;
    let mut tool_call_records: Vec<serde_json::Value> = Vec::new();

    let mut iteration: u32 = 0;
    loop {
        if events.is_closed() {
            log::info!("agent loop for conversation {} cancelled: client disconnected", conversation.id);
            return Err(DispatcherError::Cancelled);
        }

        iteration += 1;

        let mut frames = ctx
            .llm
            .run(&ctx.system_prompt, &context, tool_session.catalog())
            .await
            .map_err(|e| emit_err(&events, e))?;

        let mut had_tool_call = false;

        while let Some(frame) = frames.next().await {
            if events.is_closed() {
                log::info!("agent loop for conversation {} cancelled: client disconnected", conversation.id);
                return Err(DispatcherError::Cancelled);
            }
            let frame = frame.map_err(|e| emit_err(&events, e))?;
            match frame {
                AgentStreamEvent::TextDelta(text) => {
                    full_response.push_str(&text);
                    let _ = events.send(StreamEvent::Token { content: text });
                }
                AgentStreamEvent::MessageOutputItem(text) => {
                    last_message_output = Some(text);
                }
                AgentStreamEvent::HandoffCallItem { agent, content } => {
                    let _ = events.send(StreamEvent::AgentUpdated { agent, content });
                }
                AgentStreamEvent::ReasoningItem(text) => {
                    log::debug!("agent reasoning (conversation {}): {text}", conversation.id);
                }
                AgentStreamEvent::ToolCallOutputItem { .. } => {
                    // The model re-reporting a tool result it already has is
                    // not new information; nothing to classify or forward.
                }
                AgentStreamEvent::ToolCallItem { name, arguments_json, call_id } => {
                    had_tool_call = true;

                    if !arguments_json.is_object() {
                        let err = AgentError::InvalidResponse(format!(
                            "tool '{name}' called with non-object arguments"
                        ));
                        return Err(emit_err(&events, err).into());
                    }

                    let _ = events.send(StreamEvent::ToolCall {
                        tool: name.clone(),
                        args: arguments_json.clone(),
                        call_id: call_id.clone(),
                    });

                    let output = tool_session
                        .call(&name, arguments_json.clone())
                        .await
                        .map_err(|e| emit_err(&events, e))?;

                    let _ = events.send(StreamEvent::ToolResult { call_id: call_id.clone(), output: output.clone() });

                    tool_call_records.push(serde_json::json!({
                        "call_id": call_id,
                        "tool": name,
                        "arguments": arguments_json,
                        "output": output,
                    }));

                    // Fold the tool's output back into the context so the
                    // next model round trip can act on it.
                    context.push(DomainMessage {
                        id: 0,
                        conversation_id: conversation.id,
                        role: Role::System,
                        content: format!("Tool '{name}' returned: {output}"),
                        tool_calls: None,
                        created_at: Utc::now().naive_utc(),
                    });

                    if events.is_closed() {
                        log::info!("agent loop for conversation {} cancelled: client disconnected", conversation.id);
                        return Err(DispatcherError::Cancelled);
                    }
                }
                AgentStreamEvent::Finished => {}
            }
        }

        if !had_tool_call || iteration >= ctx.max_tool_iterations {
            break;
        }
    }

    if full_response.is_empty() {
        full_response = last_message_output.unwrap_or_default();
    }

    let tool_calls_json = if tool_call_records.is_empty() { None } else { Some(serde_json::Value::Array(tool_call_records)) };

    let assistant_message = ctx
        .store
        .append_message(conversation.id, Role::Assistant, &full_response, tool_calls_json.clone())
        .await
        .map_err(|e| emit_err(&events, AgentError::Unknown(e.to_string())))?;

    let _ = events.send(StreamEvent::Done { conversation_id: conversation.id, message_id: assistant_message.id });

    Ok(ChatResult {
        conversation_id: conversation.id,
        message_id: assistant_message.id,
        response: full_response,
        tool_calls: tool_calls_json,
    })
}
