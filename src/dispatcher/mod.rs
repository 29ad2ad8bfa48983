//! The chat dispatcher (§4.1): the agent loop and its SSE encoding.
//!
//! `agent_loop::run` is the single state machine backing both `POST /chat`
//! (drain-to-completion) and `POST /chat/stream` (forward-as-produced);
//! the two HTTP handlers in `routes` differ only in how they consume the
//! event channel the loop writes to.

pub mod agent_loop;
pub mod routes;
pub mod sse;
pub mod title;

pub use agent_loop::{ChatRequest, ChatResult, DispatcherContext, DispatcherError};
pub use sse::StreamEvent;

impl DispatcherError {
    /// HTTP status for the non-streaming `/chat` handler (§7: "maps codes
    /// to HTTP status: 504 timeout, 503 model/connection, 500
    /// tool/agent/unknown"; a validation failure is a plain 400).
    pub fn http_status(&self) -> u16 {
        match self {
            DispatcherError::InvalidMessageLength => 400,
            DispatcherError::Agent(err) => err.code().http_status(),
            DispatcherError::Cancelled => 499,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            DispatcherError::InvalidMessageLength => {
                "message must be between 1 and 4000 characters".to_string()
            }
            DispatcherError::Agent(err) => err.user_message().to_string(),
            DispatcherError::Cancelled => "the request was cancelled".to_string(),
        }
    }
}
