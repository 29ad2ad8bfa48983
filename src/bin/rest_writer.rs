//! REST write surface entrypoint: task CRUD over HTTP (§6).

use std::sync::Arc;

use taskflow_core::auth::JwksCache;
use taskflow_core::eventbus::SidecarBus;
use taskflow_core::rest_writer::{rest_writer_router, RestWriterState};
use taskflow_core::store::postgres::PgStore;
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

    let state = RestWriterState {
        store: Arc::new(store),
        bus: Arc::new(SidecarBus::new(config.sidecar_base_url(), config.pubsub_name.clone())),
        jwks: Arc::new(JwksCache::new(config.jwks_url.clone())),
    };

    let app = rest_writer_router(state);

    log::info!("rest writer listening on {}", config.rest_writer_bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.rest_writer_bind_addr).await.unwrap_or_else(|err| {
        log::error!("failed to bind {}: {err}", config.rest_writer_bind_addr);
        std::process::exit(1);
    });
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("rest writer server error: {err}");
    }
}
