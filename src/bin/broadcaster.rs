//! WebSocket broadcaster entrypoint: `ws://…/ws/{user_id}`, a `task-updates`
//! delivery endpoint, and the heartbeat loop (§4.7).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{http::StatusCode, Router};
use serde_json::{json, Value};

use taskflow_core::auth::JwksCache;
use taskflow_core::broadcaster::ws_routes::{ws_handler, BroadcasterState};
use taskflow_core::broadcaster::ConnectionManager;
use taskflow_core::domain::TaskUpdateEvent;
use taskflow_core::Config;

#[derive(Clone)]
struct FanoutState {
    manager: Arc<ConnectionManager>,
    pubsub_name: String,
}

async fn subscribe(State(state): State<FanoutState>) -> impl IntoResponse {
    Json(json!([{ "pubsubname": state.pubsub_name, "topic": "task-updates", "route": "/events" }]))
}

async fn events(State(state): State<FanoutState>, Json(envelope): Json<Value>) -> impl IntoResponse {
    let event: TaskUpdateEvent = match serde_json::from_value(envelope.get("data").cloned().unwrap_or(envelope)) {
        Ok(event) => event,
        Err(err) => {
            log::warn!("broadcaster: malformed task-updates envelope: {err}");
            return StatusCode::OK;
        }
    };
    let payload = serde_json::to_value(&event).unwrap_or(Value::Null);
    state.manager.broadcast_to_user(event.user_id, &payload).await;
    StatusCode::OK
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env().unwrap_or_else(|err| {
        log::error!("configuration error: {err}");
        std::process::exit(1);
    });

    let manager = Arc::new(ConnectionManager::new());
    let jwks = Arc::new(JwksCache::new(config.jwks_url.clone()));

    {
        let manager = manager.clone();
        let interval = Duration::from_secs(config.heartbeat_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                manager.send_heartbeat().await;
            }
        });
    }

    let ws_state = BroadcasterState { manager: manager.clone(), jwks };
    let fanout_state = FanoutState { manager, pubsub_name: config.pubsub_name.clone() };

    let ws_router = Router::new().route("/ws/{user_id}", get(ws_handler)).with_state(ws_state);
    let fanout_router = Router::new()
        .route("/dapr/subscribe", get(subscribe))
        .route("/events", post(events))
        .with_state(fanout_state);
    let app = ws_router.merge(fanout_router);

    log::info!("broadcaster listening on {}", config.broadcaster_bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.broadcaster_bind_addr).await.unwrap_or_else(|err| {
        log::error!("failed to bind {}: {err}", config.broadcaster_bind_addr);
        std::process::exit(1);
    });
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("broadcaster server error: {err}");
    }
}
