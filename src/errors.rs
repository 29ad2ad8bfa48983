//! Error taxonomy shared across the dispatcher, tool server, and consumers.
//!
//! `AgentError` is the `Result<T, AgentError>` type the agent loop returns
//! at every boundary instead of throwing; the SSE encoder (`dispatcher::sse`)
//! converts it to a terminal `error` frame. `StoreError` is kept separate so
//! a database failure is never misreported as a model failure.

use thiserror::Error;

/// Stable error codes surfaced to clients, one per failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    RateLimit,
    AuthError,
    ConnectionError,
    ModelUnavailable,
    Timeout,
    ToolError,
    InvalidResponse,
    UnknownError,
}

impl ErrorCode {
    /// Stable wire string, as it appears in the SSE `error` event's `code` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RateLimit => "rate_limit",
            ErrorCode::AuthError => "auth_error",
            ErrorCode::ConnectionError => "connection_error",
            ErrorCode::ModelUnavailable => "model_unavailable",
            ErrorCode::Timeout => "timeout",
            ErrorCode::ToolError => "tool_error",
            ErrorCode::InvalidResponse => "invalid_response",
            ErrorCode::UnknownError => "unknown_error",
        }
    }

    /// Fixed, friendly message shown to the end user for this code.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorCode::RateLimit => "The assistant is busy right now, please try again shortly.",
            ErrorCode::AuthError => "The assistant could not authenticate with its model provider.",
            ErrorCode::ConnectionError => "A temporary connection issue occurred, please try again.",
            ErrorCode::ModelUnavailable => "The assistant's model is temporarily unavailable.",
            ErrorCode::Timeout => "The request took too long and was cancelled.",
            ErrorCode::ToolError => "One of the assistant's actions failed to complete.",
            ErrorCode::InvalidResponse => "The assistant produced an unexpected response; try rephrasing.",
            ErrorCode::UnknownError => "Something went wrong. Please try again.",
        }
    }

    /// Whether this class of error is safe to retry automatically.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RateLimit | ErrorCode::ConnectionError | ErrorCode::ModelUnavailable | ErrorCode::Timeout
        )
    }

    /// Classify a raw upstream error string the way the dispatcher's error
    /// boundary does, by scanning for known substrings (mirrors the "token
    /// classification" scenario in the testable properties).
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("429") || lower.contains("too many requests") || lower.contains("rate limit") {
            ErrorCode::RateLimit
        } else if lower.contains("401") || lower.contains("unauthorized") || lower.contains("invalid api key") {
            ErrorCode::AuthError
        } else if lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline") {
            ErrorCode::Timeout
        } else if lower.contains("connection") || lower.contains("connect error") || lower.contains("dns") {
            ErrorCode::ConnectionError
        } else if lower.contains("503") || lower.contains("502") || lower.contains("500") || lower.contains("unavailable") {
            ErrorCode::ModelUnavailable
        } else {
            ErrorCode::UnknownError
        }
    }

    /// HTTP status the non-streaming `/chat` handler maps this code to.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::Timeout => 504,
            ErrorCode::ModelUnavailable | ErrorCode::ConnectionError => 503,
            ErrorCode::ToolError
            | ErrorCode::AuthError
            | ErrorCode::InvalidResponse
            | ErrorCode::RateLimit
            | ErrorCode::UnknownError => 500,
        }
    }
}

/// Error crossing the agent loop boundary. Every variant carries enough
/// detail for structured internal logging while `code()`/`user_message()`
/// expose only the stable, safe projection to clients.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("rate limited by model provider: {0}")]
    RateLimit(String),
    #[error("model provider authentication failed: {0}")]
    AuthError(String),
    #[error("transient connection error: {0}")]
    ConnectionError(String),
    #[error("model provider unavailable: {0}")]
    ModelUnavailable(String),
    #[error("operation timed out: {0}")]
    Timeout(String),
    #[error("tool '{tool}' failed: {detail}")]
    ToolError { tool: String, detail: String },
    #[error("model produced malformed output: {0}")]
    InvalidResponse(String),
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl AgentError {
    pub fn code(&self) -> ErrorCode {
        match self {
            AgentError::RateLimit(_) => ErrorCode::RateLimit,
            AgentError::AuthError(_) => ErrorCode::AuthError,
            AgentError::ConnectionError(_) => ErrorCode::ConnectionError,
            AgentError::ModelUnavailable(_) => ErrorCode::ModelUnavailable,
            AgentError::Timeout(_) => ErrorCode::Timeout,
            AgentError::ToolError { .. } => ErrorCode::ToolError,
            AgentError::InvalidResponse(_) => ErrorCode::InvalidResponse,
            AgentError::Unknown(_) => ErrorCode::UnknownError,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.code().user_message()
    }

    /// Build an `AgentError` from a raw upstream error by substring
    /// classification, the same rule `ErrorCode::classify` implements.
    pub fn from_upstream(message: impl Into<String>) -> Self {
        let message = message.into();
        match ErrorCode::classify(&message) {
            ErrorCode::RateLimit => AgentError::RateLimit(message),
            ErrorCode::AuthError => AgentError::AuthError(message),
            ErrorCode::ConnectionError => AgentError::ConnectionError(message),
            ErrorCode::ModelUnavailable => AgentError::ModelUnavailable(message),
            ErrorCode::Timeout => AgentError::Timeout(message),
            _ => AgentError::Unknown(message),
        }
    }
}

/// Persistence-layer error, kept distinct from `AgentError` so a database
/// fault is never reported to a chat client as a model failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rate_limit_from_substring() {
        let err = AgentError::from_upstream("upstream returned 429 Too Many Requests");
        assert_eq!(err.code(), ErrorCode::RateLimit);
        assert_eq!(err.code().as_str(), "rate_limit");
    }

    #[test]
    fn classifies_unknown_by_default() {
        let err = AgentError::from_upstream("the sky fell");
        assert_eq!(err.code(), ErrorCode::UnknownError);
    }

    #[test]
    fn http_status_mapping_matches_taxonomy() {
        assert_eq!(ErrorCode::Timeout.http_status(), 504);
        assert_eq!(ErrorCode::ModelUnavailable.http_status(), 503);
        assert_eq!(ErrorCode::ConnectionError.http_status(), 503);
        assert_eq!(ErrorCode::ToolError.http_status(), 500);
        assert_eq!(ErrorCode::UnknownError.http_status(), 500);
    }
}
