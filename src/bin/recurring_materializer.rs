//! Recurring materializer entrypoint: subscribes `task-events`, posts the
//! next occurrence to the REST write surface on a completed recurring
//! task (§4.6).

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{http::StatusCode, Router};
use serde_json::{json, Value};

use taskflow_core::consumers::recurring_materializer::handle;
use taskflow_core::domain::events::TaskEvent;
use taskflow_core::Config;

#[derive(Clone)]
struct AppState {
    http: reqwest::Client,
    rest_base_url: String,
    pubsub_name: String,
}

async fn subscribe(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!([{ "pubsubname": state.pubsub_name, "topic": "task-events", "route": "/events" }]))
}

async fn events(State(state): State<AppState>, Json(envelope): Json<Value>) -> impl IntoResponse {
    let event: TaskEvent = match serde_json::from_value(envelope.get("data").cloned().unwrap_or(envelope)) {
        Ok(event) => event,
        Err(err) => {
            log::warn!("recurring_materializer: malformed task-events envelope: {err}");
            return StatusCode::OK;
        }
    };
    handle(&state.http, &state.rest_base_url, event).await;
    StatusCode::OK
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env().unwrap_or_else(|err| {
        log::error!("configuration error: {err}");
        std::process::exit(1);
    });

    let state = AppState {
        http: reqwest::Client::new(),
        rest_base_url: config.rest_writer_base_url.clone(),
        pubsub_name: config.pubsub_name.clone(),
    };
    let app = Router::new()
        .route("/dapr/subscribe", get(subscribe))
        .route("/events", post(events))
        .with_state(state);

    log::info!("recurring materializer listening on {}", config.recurring_materializer_bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.recurring_materializer_bind_addr).await.unwrap_or_else(|err| {
        log::error!("failed to bind {}: {err}", config.recurring_materializer_bind_addr);
        std::process::exit(1);
    });
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("recurring materializer server error: {err}");
    }
}
