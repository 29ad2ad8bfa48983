//! The `run(context, catalog) -> async sequence of {type, payload}` contract.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::conversation::Message as DomainMessage;
use crate::errors::AgentError;

/// One entry in the dynamically-discovered tool catalog (§4.1 step 3: "the
/// tool catalog is discovered dynamically; do not hard-code tool names").
///
/// Also the wire shape the tool server's `GET /tools` returns, so the
/// dispatcher's [`crate::tool_client::ToolServerSession`] can deserialize it
/// straight off the HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCatalogEntry {
    pub name: String,
    pub description: String,
    pub parameters_schema: Value,
}

/// A single frame of agent progress, normalized from whatever shape the
/// upstream model emits. Modeled as a finite, non-restartable sequence
/// with a terminal `Finished` (§9: "async generator streaming" note).
#[derive(Debug, Clone)]
pub enum AgentStreamEvent {
    TextDelta(String),
    ToolCallItem { name: String, arguments_json: Value, call_id: String },
    ToolCallOutputItem { call_id: String, output: String },
    MessageOutputItem(String),
    HandoffCallItem { agent: String, content: String },
    ReasoningItem(String),
    Finished,
}

/// A live sequence of agent frames, one per chunk the provider emits over
/// the wire. Mirrors the reference toolkit's `MessageChunkStream` type
/// alias (`client_wrapper.rs`): a boxed, pinned, `Send` stream rather than
/// a `Vec` collected only after the whole response has arrived.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = Result<AgentStreamEvent, AgentError>> + Send>>;

/// Trait-driven abstraction for a concrete model provider, mirroring the
/// way the reference toolkit's `ClientWrapper` decouples the agent loop
/// from any one vendor's wire format.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Open one model round trip given the full message context and the
    /// currently discovered tool catalog, returning a stream of frames the
    /// dispatcher classifies and emits as they arrive (§4.1 step 4-5: "for
    /// each chunk received, classify and emit"). The returned future
    /// resolves once the connection is established (after any
    /// connection-level retries); the stream itself yields frames as the
    /// provider sends them, ending in `Finished`.
    async fn run(
        &self,
        system_prompt: &str,
        context: &[DomainMessage],
        catalog: &[ToolCatalogEntry],
    ) -> Result<AgentEventStream, AgentError>;
}
