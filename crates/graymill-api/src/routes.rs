//! Router assembly.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{gallery, health, upload};
use crate::state::AppState;

/// Build the application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    // Multipart framing overhead on top of the image itself.
    let body_limit = state.config.max_file_size_bytes + 64 * 1024;

    Router::new()
        .route("/", get(upload::upload_form))
        .route("/upload", post(upload::upload_image))
        .route("/gallery", get(gallery::list_gallery))
        .route("/gallery/view", get(gallery::gallery_view))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
