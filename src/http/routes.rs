use super::handlers;
use super::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and part headers around a chunk
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let body_limit = state.max_chunk_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        // Service info
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        // Recording sessions
        .route("/api/start-session", post(handlers::start_session))
        .route("/api/upload-chunk", post(handlers::upload_chunk))
        .route("/api/finalize-session", post(handlers::finalize_session))
        .route("/api/sessions", get(handlers::list_sessions))
        .route("/api/sessions/:session_id", get(handlers::get_session))
        // Tracks
        .route("/api/tracks", get(handlers::list_tracks))
        .route("/api/tracks/:track_id", delete(handlers::delete_track))
        .route("/api/download/:track_id", get(handlers::download_track))
        .layer(DefaultBodyLimit::max(body_limit))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
