//! Reminder engine callback endpoint: the sidecar's Jobs API posts
//! `{data}` here at fire time (§6 Jobs API contract).

use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::{http::StatusCode, Router};
use serde::Deserialize;
use serde_json::Value;

use taskflow_core::eventbus::SidecarBus;
use taskflow_core::reminders::ReminderEngine;
use taskflow_core::store::postgres::PgStore;
use taskflow_core::store::Store;
use taskflow_core::Config;

#[derive(Clone)]
struct CallbackState {
    store: Arc<dyn Store>,
    reminders: Arc<ReminderEngine>,
}

#[derive(Deserialize)]
struct CallbackPayload {
    reminder_id: i64,
    task_id: i64,
}

async fn callback(State(state): State<CallbackState>, Json(body): Json<Value>) -> impl IntoResponse {
    let payload: CallbackPayload = match serde_json::from_value(body.get("data").cloned().unwrap_or(body)) {
        Ok(payload) => payload,
        Err(err) => {
            log::warn!("reminder callback received malformed payload: {err}");
            return StatusCode::BAD_REQUEST;
        }
    };

    let title = match state.store.get_reminder(payload.reminder_id).await {
        Ok(reminder) => match state.store.list_tasks(reminder.owner, Default::default()).await {
            Ok(tasks) => tasks
                .into_iter()
                .find(|t| t.id == payload.task_id)
                .map(|t| t.title)
                .unwrap_or_else(|| "your task".to_string()),
            Err(_) => "your task".to_string(),
        },
        Err(_) => {
            log::info!("reminder {} callback fired but reminder no longer exists", payload.reminder_id);
            return StatusCode::OK;
        }
    };

    match state.reminders.handle_callback(payload.reminder_id, &title).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            log::warn!("reminder callback {} failed: {err}", payload.reminder_id);
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

    let bus = Arc::new(SidecarBus::new(config.sidecar_base_url(), config.pubsub_name.clone()));
    let store: Arc<dyn Store> = Arc::new(store);
    let reminders = Arc::new(ReminderEngine::new(store.clone(), bus));

    let state = CallbackState { store, reminders };
    let app = Router::new().route("/callback", post(callback)).with_state(state);

    log::info!("reminder engine callback listening on {}", config.reminder_engine_bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.reminder_engine_bind_addr).await.unwrap_or_else(|err| {
        log::error!("failed to bind {}: {err}", config.reminder_engine_bind_addr);
        std::process::exit(1);
    });
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("reminder engine server error: {err}");
    }
}
