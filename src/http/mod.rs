//! HTTP API used by the recording plugin
//!
//! All `/api` routes authenticate with HTTP Basic credentials:
//! - POST /api/start-session - Open a recording session
//! - POST /api/upload-chunk?session_id= - Upload one WAV chunk
//! - POST /api/finalize-session?session_id= - Assemble chunks into a track
//! - GET /api/sessions - List the caller's sessions
//! - GET /api/sessions/:id - Session status
//! - GET /api/tracks - List the caller's tracks
//! - GET /api/download/:id - Download a track
//! - DELETE /api/tracks/:id - Delete a track
//! - GET /health - Health check

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ErrorResponse};
pub use handlers::Principal;
pub use routes::create_router;
pub use state::AppState;
