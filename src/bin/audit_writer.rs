//! Audit writer entrypoint: subscribes `task-events` via the sidecar's
//! push-delivery convention (§4.6) — `GET /dapr/subscribe` declares the
//! subscription, `POST /events` receives each delivered envelope.

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{http::StatusCode, Router};
use serde_json::{json, Value};

use taskflow_core::consumers::audit_writer::handle;
use taskflow_core::domain::events::TaskEvent;
use taskflow_core::store::postgres::PgStore;
use taskflow_core::store::Store;
use taskflow_core::Config;

#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
    pubsub_name: String,
}

async fn subscribe(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!([{ "pubsubname": state.pubsub_name, "topic": "task-events", "route": "/events" }]))
}

async fn events(State(state): State<AppState>, Json(envelope): Json<Value>) -> impl IntoResponse {
    let event: TaskEvent = match serde_json::from_value(envelope.get("data").cloned().unwrap_or(envelope)) {
        Ok(event) => event,
        Err(err) => {
            log::warn!("audit_writer: malformed task-events envelope: {err}");
            return StatusCode::OK;
        }
    };
    match handle(state.store.as_ref(), event).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            log::warn!("audit_writer: failed to write audit log: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = Config::from_env().unwrap_or_else(|err| {
        log::error!("configuration error: {err}");
        std::process::exit(1);
    });

    let store = PgStore::connect(&config.database_url).await.unwrap_or_else(|err| {
        log::error!("failed to connect to database: {err}");
        std::process::exit(1);
    });
    store.bootstrap().await.unwrap_or_else(|err| {
        log::error!("failed to bootstrap schema: {err}");
        std::process::exit(1);
    });

    let state = AppState { store: Arc::new(store), pubsub_name: config.pubsub_name.clone() };
    let app = Router::new()
        .route("/dapr/subscribe", get(subscribe))
        .route("/events", post(events))
        .with_state(state);

    log::info!("audit writer listening on {}", config.audit_writer_bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.audit_writer_bind_addr).await.unwrap_or_else(|err| {
        log::error!("failed to bind {}: {err}", config.audit_writer_bind_addr);
        std::process::exit(1);
    });
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("audit writer server error: {err}");
    }
}
