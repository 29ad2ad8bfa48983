//! HTTP surface for the chat dispatcher: `POST /chat` drains the agent
//! loop to one JSON response, `POST /chat/stream` forwards its frames as
//! Server-Sent Events as they're produced (§4.1, §6).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::{http::StatusCode, Router};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

use super::agent_loop::{self, ChatRequest, DispatcherContext};
use super::sse::StreamEvent;

/// Pull the bearer token out of `Authorization: Bearer <token>` and verify
/// it, returning the subject as the chat's owning user (§6 Auth: "Clients
/// present a signed bearer token... extracts `sub` as user id").
async fn authenticate(ctx: &DispatcherContext, headers: &HeaderMap) -> Result<Uuid, (StatusCode, Json<ErrorBody>)> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("missing bearer token"))?;
    ctx.jwks.verify(token).await.map_err(|_| unauthorized("invalid bearer token"))
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::UNAUTHORIZED, Json(ErrorBody { message: message.to_string() }))
}

pub fn dispatcher_router(ctx: Arc<DispatcherContext>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/stream", post(chat_stream))
        .with_state(ctx)
}

#[derive(Deserialize)]
pub struct ChatBody {
    pub conversation_id: Option<Uuid>,
    pub message: String,
}

#[derive(Serialize)]
struct ChatResponseBody {
    conversation_id: Uuid,
    message_id: i64,
    response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// Drain the agent loop to completion and return one JSON document. Events
/// are produced on an internal channel exactly as in the streaming path;
/// they're just collapsed here instead of forwarded.
async fn chat(
    State(ctx): State<Arc<DispatcherContext>>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> axum::response::Response {
    let owner = match authenticate(&ctx, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response.into_response(),
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<StreamEvent>();

    let req = ChatRequest { owner, conversation_id: body.conversation_id, message: body.message };

    // Drain (and discard) frames concurrently with the loop so an unbounded
    // channel never backs up waiting for a reader that won't show up until
    // the loop returns.
    let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

    let result = agent_loop::run(&ctx, req, tx).await;
    let _ = drain.await;

    match result {
        Ok(chat_result) => {
            let body = ChatResponseBody {
                conversation_id: chat_result.conversation_id,
                message_id: chat_result.message_id,
                response: chat_result.response,
                tool_calls: chat_result.tool_calls,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(ErrorBody { message: err.user_message() })).into_response()
        }
    }
}

/// Stream the agent loop's frames live. The client disconnecting drops the
/// response stream and thus the receiver; `agent_loop::run` polls
/// `events.is_closed()` at the top of each iteration and after every tool
/// call, so it stops issuing further model/tool calls within one loop
/// iteration of the receiver going away instead of running to completion
/// for nobody.
async fn chat_stream(
    State(ctx): State<Arc<DispatcherContext>>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::unbounded_channel::<StreamEvent>();

    let owner = match authenticate(&ctx, &headers).await {
        Ok(owner) => owner,
        Err((_, Json(body))) => {
            let _ = tx.send(StreamEvent::Error {
                message: body.message,
                code: crate::errors::ErrorCode::AuthError,
            });
            let stream = UnboundedReceiverStream::new(rx).map(|event| Ok(event.into_sse_event()));
            return Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"));
        }
    };

    let req = ChatRequest { owner, conversation_id: body.conversation_id, message: body.message };

    tokio::spawn(async move {
        let _ = agent_loop::run(&ctx, req, tx).await;
    });

    let stream = UnboundedReceiverStream::new(rx).map(|event| Ok(event.into_sse_event()));

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}
