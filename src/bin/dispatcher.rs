//! Chat dispatcher entrypoint: `POST /chat` and `POST /chat/stream` (§4.1).

use std::sync::Arc;

use taskflow_core::auth::JwksCache;
use taskflow_core::dispatcher::agent_loop::DispatcherContext;
use taskflow_core::dispatcher::routes::dispatcher_router;
use taskflow_core::llm::gemini::GeminiAgentClient;
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

    let llm = GeminiAgentClient::new(
        config.gemini_base_url.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.model_retry_attempts,
    );

    let ctx = Arc::new(DispatcherContext {
        store: Arc::new(store),
        llm: Arc::new(llm),
        jwks: Arc::new(JwksCache::new(config.jwks_url.clone())),
        tool_server_url: config.tool_server_url.clone(),
        system_prompt: "You are a helpful task management assistant.".to_string(),
        max_tool_iterations: config.max_tool_iterations,
    });

    let app = dispatcher_router(ctx);

    log::info!("dispatcher listening on {}", config.dispatcher_bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.dispatcher_bind_addr).await.unwrap_or_else(|err| {
        log::error!("failed to bind {}: {err}", config.dispatcher_bind_addr);
        std::process::exit(1);
    });
    if let Err(err) = axum::serve(listener, app).await {
        log::error!("dispatcher server error: {err}");
    }
}
