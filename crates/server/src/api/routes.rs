use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{convert, episodes, handlers, middleware::metrics_middleware, progress};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let output_dir = state.config().storage.output_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Jobs
        .route("/convert", post(convert::submit))
        .route("/progress/{id}", get(progress::stream_progress))
        // Episodes
        .route("/episodes", get(episodes::list_episodes))
        .route("/episodes/{file}", delete(episodes::delete_episode));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/feed", get(episodes::feed))
        .route("/metrics", get(handlers::metrics))
        .nest_service("/mp3s", ServeDir::new(output_dir))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
