use super::handlers;
use super::state::AppState;
use crate::storage::Storage;
use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router<S: Storage>(state: AppState<S>) -> Router {
    Router::new()
        // Device identity and health
        .route("/", get(handlers::device_info::<S>))
        .route("/health", get(handlers::health_check))
        // Recording control
        .route("/start", get(handlers::start_recording::<S>))
        .route("/stop", get(handlers::stop_recording::<S>))
        .route("/status", get(handlers::recorder_status::<S>))
        .route("/set_time", get(handlers::set_time::<S>))
        // File management
        .route("/list", get(handlers::list_files::<S>))
        .route("/download", get(handlers::download_file::<S>))
        .route("/delete", get(handlers::delete_file::<S>))
        .route("/rename", get(handlers::rename_file::<S>))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
