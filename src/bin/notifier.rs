//! Notifier entrypoint: subscribes `reminder-events`, republishes
//! `due` reminders onto `task-updates` (§4.6).

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{http::StatusCode, Router};
use serde_json::{json, Value};

use taskflow_core::consumers::notifier::handle;
use taskflow_core::domain::ReminderEvent;
use taskflow_core::eventbus::SidecarBus;
use taskflow_core::Config;

#[derive(Clone)]
struct AppState {
    bus: Arc<SidecarBus>,
    pubsub_name: String,
}

async fn subscribe(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!([{ "pubsubname": state.pubsub_name, "topic": "reminder-events", "route": "/events" }]))
}

async fn events(State(state): State<AppState>, Json(envelope): Json<Value>) -> impl IntoResponse {
    let event: ReminderEvent = match serde_json::from_value(envelope.get("data").cloned().unwrap_or(envelope)) {
        Ok(event) => event,
        Err(err) => {
            log::warn!("notifier: malformed reminder-events envelope: {err}");
            return StatusCode::OK;
        }
    };
    handle(state.bus.as_ref(), event).await;
    StatusCode::OK
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env().unwrap_or_else(|err| {
        log::error!("configuration error: {err}");
        std::process::exit(1);
    });

    let bus = Arc::new(SidecarBus::new(config.sidecar_base_url(), config.pubsub_name.clone()));
    let state = AppState { bus, pubsub_name: config.pubsub_name.clone() };
    let app = Router::new()
        .route("/dapr/subscribe", get(subscribe))
        .route("/events", post(events))
        .with_state(state);

    log::info!("notifier listening on {}", config.notifier_bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.notifier_bind_addr).await.unwrap_or_else(|err| {
        log::error!("failed to bind {}: {err}", config.notifier_bind_addr);
        std::process::exit(1);
    });
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("notifier server error: {err}");
    }
}
