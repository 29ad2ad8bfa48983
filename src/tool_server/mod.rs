//! The MCP tool server (§4.3): a standalone process exposing a bounded
//! catalog of tools over HTTP. Tools are the *only* path the agent uses to
//! read or mutate user state during a chat — the dispatcher never talks to
//! the store directly.
//!
//! `user_id` is derived from a per-connection query parameter (§4.3); tool
//! arguments never carry a `user_id` field, so a malicious or buggy model
//! can't impersonate another user through the tool-call payload.

pub mod catalog;
pub mod handlers;
pub mod routes;

pub use catalog::build_catalog;
pub use routes::{tool_server_router, ToolServerState};
