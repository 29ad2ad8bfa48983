//! Event-driven core of a multi-user task platform.
//!
//! The crate is organized by concern rather than by binary: each
//! `src/bin/*.rs` entrypoint wires a handful of these modules together.
//! See the module list below for where each piece of the design lives.

pub mod auth;
pub mod broadcaster;
pub mod config;
pub mod consumers;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod eventbus;
pub mod llm;
pub mod recurrence;
pub mod reminders;
pub mod rest_writer;
pub mod store;
pub mod tool_client;
pub mod tool_server;

pub use config::Config;
pub use errors::{AgentError, ErrorCode, StoreError};
