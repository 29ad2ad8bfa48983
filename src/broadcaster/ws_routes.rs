//! `ws://…/ws/{user_id}?token=<jwt>` connection handler (§4.7).
//!
//! The server verifies the token, decodes the subject, and enforces
//! `subject == user_id` from the path. Mismatches are closed with a
//! policy-violation close code (1008) before the socket is ever
//! registered with the [`ConnectionManager`] — so the isolation invariant
//! in §8 holds independent of anything downstream.

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::JwksCache;

use super::ConnectionManager;

const POLICY_VIOLATION: u16 = 1008;

#[derive(Clone)]
pub struct BroadcasterState {
    pub manager: Arc<ConnectionManager>,
    pub jwks: Arc<JwksCache>,
}

#[derive(Deserialize)]
pub struct WsQuery {
    token: String,
}

pub async fn ws_handler(
    Path(user_id): Path<Uuid>,
    Query(query): Query<WsQuery>,
    State(state): State<BroadcasterState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, query.token, state))
}

async fn handle_socket(mut socket: WebSocket, path_user_id: Uuid, token: String, state: BroadcasterState) {
    let subject = match state.jwks.verify(&token).await {
        Ok(subject) => subject,
        Err(err) => {
            log::warn!("websocket auth failed: {err}");
            let _ = close_with_policy_violation(&mut socket, "invalid token").await;
            return;
        }
    };
    if subject != path_user_id {
        log::warn!("websocket path user {path_user_id} does not match token subject {subject}");
        let _ = close_with_policy_violation(&mut socket, "subject mismatch").await;
        return;
    }

    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel();
    let connection_id = state.manager.connect(path_user_id, outbox_tx).await;
    let (mut sender, mut receiver) = socket.split();

    let forward_task = tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        match message {
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    forward_task.abort();
    state.manager.disconnect(path_user_id, connection_id).await;
}

async fn close_with_policy_violation(socket: &mut WebSocket, reason: &str) -> Result<(), axum::Error> {
    socket
        .send(WsMessage::Close(Some(CloseFrame {
            code: POLICY_VIOLATION,
            reason: Cow::Owned(reason.to_string()),
        })))
        .await
}
