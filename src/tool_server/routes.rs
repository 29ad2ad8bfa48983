//! HTTP surface for the tool server: catalog discovery and tool invocation,
//! both scoped by a `user_id` query parameter (§4.3) rather than by an
//! argument a model could forge.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::reminders::ReminderEngine;
use crate::store::Store;

use super::catalog::build_catalog;
use super::handlers::dispatch;

#[derive(Clone)]
pub struct ToolServerState {
    pub store: Arc<dyn Store>,
    pub reminders: Arc<ReminderEngine>,
}

#[derive(Deserialize)]
pub struct UserScope {
    user_id: Uuid,
}

#[derive(Deserialize)]
pub struct InvokeRequest {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

pub fn tool_server_router(state: ToolServerState) -> Router {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/call", post(call_tool))
        .with_state(state)
}

async fn list_tools(Query(_scope): Query<UserScope>) -> impl IntoResponse {
    Json(build_catalog())
}

async fn call_tool(
    Query(scope): Query<UserScope>,
    State(state): State<ToolServerState>,
    Json(request): Json<InvokeRequest>,
) -> impl IntoResponse {
    let result = dispatch(
        state.store.as_ref(),
        state.reminders.as_ref(),
        scope.user_id,
        &request.tool,
        &request.arguments,
    )
    .await;
    Json(result)
}
