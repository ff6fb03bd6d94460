use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Composer lifecycle
        .route("/composers", post(handlers::create_composer))
        .route(
            "/composers/:composer_id",
            get(handlers::get_composer).delete(handlers::close_composer),
        )
        // Transport buttons
        .route("/composers/:composer_id/primary", post(handlers::press_primary))
        .route("/composers/:composer_id/play", post(handlers::press_play))
        .route("/composers/:composer_id/cancel", post(handlers::cancel))
        .route("/composers/:composer_id/save", post(handlers::save))
        .route("/composers/:composer_id/review", post(handlers::review))
        // Marketplace cache
        .route("/store", get(handlers::get_store))
        .route("/store/refresh", post(handlers::refresh_store))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
