use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::desk::DeskState;

pub fn desk_routes(state: Arc<DeskState>) -> Router {
    // Every draft belongs to an authenticated user
    let protected_routes = Router::new()
        .route("/drafts", post(handlers::open_draft))
        .route(
            "/drafts/{draft_id}",
            get(handlers::get_draft).delete(handlers::close_draft),
        )
        .route("/drafts/{draft_id}/events", post(handlers::apply_event))
        .route("/drafts/{draft_id}/submit", post(handlers::submit_draft))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::<DeskState>,
        ));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
