use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{episodes, handlers, middleware::metrics_middleware, orchestrator, shows};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Orchestrator
        .route("/orchestrator/status", get(orchestrator::get_status))
        .route("/orchestrator/discover", post(orchestrator::discover))
        .route("/orchestrator/monitor", post(orchestrator::monitor))
        // Shows
        .route("/shows", get(shows::list_shows))
        .route("/shows/{key}/history", delete(shows::reset_history))
        // Episodes
        .route("/episodes", get(episodes::list_episodes))
        .route("/episodes/{id}", get(episodes::get_episode));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
