//! MCP tool server entrypoint: `GET /tools`, `POST /call` (§4.3).

use std::sync::Arc;

use taskflow_core::eventbus::SidecarBus;
use taskflow_core::reminders::ReminderEngine;
use taskflow_core::store::postgres::PgStore;
use taskflow_core::tool_server::{tool_server_router, ToolServerState};
use taskflow_core::Config;

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
    let store: Arc<dyn taskflow_core::store::Store> = Arc::new(store);
    let reminders = Arc::new(ReminderEngine::new(store.clone(), bus));

    let state = ToolServerState { store, reminders };
    let app = tool_server_router(state);

    log::info!("tool server listening on {}", config.tool_server_bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.tool_server_bind_addr).await.unwrap_or_else(|err| {
        log::error!("failed to bind {}: {err}", config.tool_server_bind_addr);
        std::process::exit(1);
    });
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("tool server error: {err}");
    }
}
