//! Gemini-backed `LlmClient`, talking to Gemini's OpenAI-compatible
//! chat-completions endpoint in streaming mode (`GEMINI_MODEL`, §10.3).
//!
//! The request/response shape is adapted from the reference toolkit's
//! `send_with_native_tools` helper: POST `{base_url}/chat/completions`
//! with a bearer key, an OpenAI-format `tools` array, and a `messages`
//! array whose `tool_calls`/`tool` roles follow the same wire
//! representation table, plus `"stream": true` so the response body is a
//! `text/event-stream` of incremental `delta` chunks (§4.1 step 4-5: "for
//! each chunk received, classify and emit"). Connection-level failures
//! retry with a short linear backoff up to `max_retries` attempts (§4.2);
//! authentication failures never retry. Once the stream is open, chunks
//! are forwarded as they arrive — there is no buffering of the full
//! answer before the dispatcher sees anything.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::{json, Value};

use crate::domain::conversation::{Message as DomainMessage, Role as DomainRole};
use crate::errors::AgentError;
use crate::llm::client::{AgentEventStream, AgentStreamEvent, LlmClient, ToolCatalogEntry};
use crate::llm::wire::{TokenUsage, ToolDefinition, WireMessage, WireRole};

pub struct GeminiAgentClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl GeminiAgentClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_retries,
        }
    }

    fn wire_messages(system_prompt: &str, context: &[DomainMessage]) -> Vec<Value> {
        let mut wire = Vec::with_capacity(context.len() + 1);
        wire.push(
            WireMessage { role: WireRole::System, content: system_prompt.to_string(), tool_calls: Vec::new() }.to_json(),
        );
        for message in context {
            let role = match message.role {
                DomainRole::User => WireRole::User,
                DomainRole::Assistant => WireRole::Assistant,
                DomainRole::System => WireRole::System,
            };
            wire.push(WireMessage { role, content: message.content.clone(), tool_calls: Vec::new() }.to_json());
        }
        wire
    }

    fn wire_tools(catalog: &[ToolCatalogEntry]) -> Vec<Value> {
        catalog
            .iter()
            .map(|t| {
                ToolDefinition {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters_schema: t.parameters_schema.clone(),
                }
                .to_json()
            })
            .collect()
    }

    /// Open the streaming connection, retrying connection-level failures.
    /// Returns the raw `reqwest::Response` with its body not yet consumed.
    async fn open_stream(&self, body: &Value) -> Result<reqwest::Response, AgentError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut attempt = 0;
        loop {
            let sent = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .header("Accept", "text/event-stream")
                .json(body)
                .send()
                .await;

            match sent {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    let err = AgentError::from_upstream(format!("HTTP {status} — {text}"));
                    if err.code().retryable() && attempt + 1 < self.max_retries.max(1) {
                        attempt += 1;
                        log::warn!("model call failed ({err}), retrying (attempt {attempt})");
                        tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    let err = AgentError::from_upstream(e.to_string());
                    if err.code().retryable() && attempt + 1 < self.max_retries.max(1) {
                        attempt += 1;
                        log::warn!("model call failed ({err}), retrying (attempt {attempt})");
                        tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}

/// Partial state for one in-flight native tool call, accumulated across
/// however many `delta.tool_calls` fragments the provider sends before the
/// arguments JSON is complete.
#[derive(Default, Clone)]
struct ToolCallAccum {
    id: String,
    name: String,
    arguments: String,
}

/// Parse one SSE `data:` line, folding any tool-call deltas into `pending`
/// and returning the frames this chunk completes.
fn parse_sse_line(line: &str, pending: &mut Vec<ToolCallAccum>) -> Vec<Result<AgentStreamEvent, AgentError>> {
    let Some(data) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
        return Vec::new();
    };
    let data = data.trim();
    if data.is_empty() {
        return Vec::new();
    }
    if data == "[DONE]" {
        let mut events: Vec<Result<AgentStreamEvent, AgentError>> = pending
            .drain(..)
            .filter(|tc| !tc.name.is_empty())
            .map(|tc| {
                let arguments_json: Value = serde_json::from_str(&tc.arguments).unwrap_or_else(|_| json!({}));
                Ok(AgentStreamEvent::ToolCallItem { name: tc.name, arguments_json, call_id: tc.id })
            })
            .collect();
        events.push(Ok(AgentStreamEvent::Finished));
        return events;
    }

    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(AgentError::InvalidResponse(e.to_string()))],
    };

    if let Some(usage) = TokenUsage::from_json(&v) {
        log::debug!(
            "model usage: input={} output={} total={}",
            usage.input_tokens,
            usage.output_tokens,
            usage.total_tokens
        );
    }

    let Some(choice) = v.get("choices").and_then(|c| c.get(0)) else {
        return Vec::new();
    };
    let mut events = Vec::new();
    let delta = choice.get("delta");

    if let Some(content) = delta.and_then(|d| d.get("content")).and_then(|c| c.as_str()) {
        if !content.is_empty() {
            events.push(Ok(AgentStreamEvent::TextDelta(content.to_string())));
        }
    }

    if let Some(tool_calls) = delta.and_then(|d| d.get("tool_calls")).and_then(|v| v.as_array()) {
        for tc in tool_calls {
            let index = tc.get("index").and_then(|i| i.as_u64()).unwrap_or(0) as usize;
            while pending.len() <= index {
                pending.push(ToolCallAccum::default());
            }
            if let Some(id) = tc.get("id").and_then(|v| v.as_str()) {
                pending[index].id = id.to_string();
            }
            if let Some(func) = tc.get("function") {
                if let Some(name) = func.get("name").and_then(|v| v.as_str()) {
                    pending[index].name.push_str(name);
                }
                if let Some(args) = func.get("arguments").and_then(|v| v.as_str()) {
                    pending[index].arguments.push_str(args);
                }
            }
        }
    }

    events
}

/// Drain complete `\n`-terminated lines from `buf`, leaving any trailing
/// partial line (split across TCP chunks) for the next call.
fn drain_complete_lines(buf: &mut String, pending: &mut Vec<ToolCallAccum>) -> Vec<Result<AgentStreamEvent, AgentError>> {
    let mut events = Vec::new();
    while let Some(nl_pos) = buf.find('\n') {
        let line = buf[..nl_pos].trim_end_matches('\r').to_string();
        *buf = buf[nl_pos + 1..].to_string();
        events.extend(parse_sse_line(&line, pending));
    }
    events
}

#[async_trait]
impl LlmClient for GeminiAgentClient {
    async fn run(
        &self,
        system_prompt: &str,
        context: &[DomainMessage],
        catalog: &[ToolCatalogEntry],
    ) -> Result<AgentEventStream, AgentError> {
        let body = json!({
            "model": self.model,
            "messages": Self::wire_messages(system_prompt, context),
            "tools": Self::wire_tools(catalog),
            "stream": true,
            "stream_options": { "include_usage": true },
        });

        let resp = self.open_stream(&body).await?;
        let byte_stream = resp.bytes_stream();

        let event_stream = byte_stream
            .scan((String::new(), Vec::<ToolCallAccum>::new()), |(buf, pending), chunk| {
                let events: Vec<Result<AgentStreamEvent, AgentError>> = match chunk {
                    Ok(bytes) => {
                        buf.push_str(&String::from_utf8_lossy(&bytes));
                        drain_complete_lines(buf, pending)
                    }
                    Err(e) => vec![Err(AgentError::from_upstream(e.to_string()))],
                };
                std::future::ready(Some(events))
            })
            .flat_map(stream::iter);

        Ok(Box::pin(event_stream) as Pin<Box<dyn Stream<Item = Result<AgentStreamEvent, AgentError>> + Send>>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_delta() {
        let mut pending = Vec::new();
        let events = parse_sse_line(
            r#"data: {"choices":[{"delta":{"content":"hi"},"index":0}]}"#,
            &mut pending,
        );
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(AgentStreamEvent::TextDelta(ref t)) if t == "hi"));
    }

    #[test]
    fn accumulates_tool_call_arguments_across_fragments() {
        let mut pending = Vec::new();
        let mut buf = String::new();
        buf.push_str(r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"add_task","arguments":""}}]}}]}"#);
        buf.push('\n');
        buf.push_str(r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"title\":"}}]}}]}"#);
        buf.push('\n');
        buf.push_str(r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"milk\"}"}}]}}]}"#);
        buf.push('\n');
        drain_complete_lines(&mut buf, &mut pending);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "add_task");
        assert_eq!(pending[0].arguments, "{\"title\":\"milk\"}");

        let done_events = parse_sse_line("data: [DONE]", &mut pending);
        assert!(pending.is_empty());
        assert_eq!(done_events.len(), 2);
        match &done_events[0] {
            Ok(AgentStreamEvent::ToolCallItem { name, arguments_json, call_id }) => {
                assert_eq!(name, "add_task");
                assert_eq!(call_id, "call_1");
                assert_eq!(arguments_json["title"], "milk");
            }
            other => panic!("expected ToolCallItem, got {other:?}"),
        }
        assert!(matches!(done_events[1], Ok(AgentStreamEvent::Finished)));
    }

    #[test]
    fn done_with_no_pending_tool_calls_emits_only_finished() {
        let mut pending = Vec::new();
        let events = parse_sse_line("data: [DONE]", &mut pending);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Ok(AgentStreamEvent::Finished)));
    }
}
