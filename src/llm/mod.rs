//! LLM client (§4.2): translates an agent run into calls to the external
//! model's chat-completions API and normalizes the response to the
//! dispatcher's event vocabulary.

pub mod client;
pub mod gemini;
pub mod wire;

pub use client::{AgentEventStream, AgentStreamEvent, LlmClient, ToolCatalogEntry};
pub use gemini::GeminiAgentClient;
