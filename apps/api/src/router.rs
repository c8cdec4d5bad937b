use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use session_coordinator_cell::router::desk_routes;
use session_coordinator_cell::{spawn_draft_sweeper, DeskState};
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>) -> Router {
    let desk_state = Arc::new(DeskState::new(config));
    spawn_draft_sweeper(desk_state.clone());

    Router::new()
        .route("/", get(|| async { "Spa Desk scheduling API is running!" }))
        .route(
            "/health",
            get(|| async { Json(json!({ "status": "ok" })) }),
        )
        .nest("/scheduling", desk_routes(desk_state))
}
