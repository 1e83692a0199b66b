use super::error::ApiError;
use super::state::AppState;
use crate::catalog::TrackSummary;
use crate::error::IngestError;
use crate::ids::{SessionId, TrackId};
use crate::session::SessionSnapshot;
use crate::storage;
use axum::{
    async_trait,
    extract::{FromRequestParts, Multipart, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Multipart field carrying the chunk bytes
const CHUNK_FIELD: &str = "file";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Authenticated owner of the current request
pub struct Principal(pub String);

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.resolver.resolve(&parts.headers)?))
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadChunkQuery {
    /// Target session; a new one is created for the caller when absent
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeQuery {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct UploadChunkResponse {
    pub message: String,
    pub session_id: SessionId,
    pub sequence: u64,
    pub chunk_size: usize,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub message: String,
    pub track_id: TrackId,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// Unparseable IDs cannot name anything that exists
fn parse_session_id(raw: &str) -> Result<SessionId, ApiError> {
    raw.parse()
        .map_err(|_| IngestError::SessionNotFound(raw.to_string()).into())
}

fn parse_track_id(raw: &str) -> Result<TrackId, ApiError> {
    raw.parse()
        .map_err(|_| IngestError::TrackNotFound(raw.to_string()).into())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /
/// Service banner
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: state.service_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
    })
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// POST /api/start-session
/// Start a new recording session for the caller
pub async fn start_session(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Json<StartSessionResponse> {
    info!("User '{}' starting new recording session", owner);
    let session_id = state.sessions.create_session(&owner).await;

    Json(StartSessionResponse {
        session_id,
        message: "Recording session started".to_string(),
    })
}

/// POST /api/upload-chunk?session_id=
/// Receive one audio chunk (multipart field `file`)
pub async fn upload_chunk(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Query(query): Query<UploadChunkQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadChunkResponse>, ApiError> {
    let mut chunk = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(CHUNK_FIELD) {
            chunk = Some(field.bytes().await?);
            break;
        }
    }
    let chunk = chunk.ok_or_else(|| {
        ApiError::BadRequest(format!("missing multipart field '{}'", CHUNK_FIELD))
    })?;

    if chunk.len() > state.max_chunk_bytes {
        return Err(ApiError::PayloadTooLarge(state.max_chunk_bytes));
    }

    let session_id = match query.session_id.as_deref() {
        Some(raw) => {
            let session_id = parse_session_id(raw)?;
            state
                .sessions
                .require_session_owner(&session_id, &owner)
                .await?;
            session_id
        }
        None => {
            info!("Auto-creating session for user '{}'", owner);
            state.sessions.create_session(&owner).await
        }
    };

    debug!("Receiving chunk from '{}': {} bytes", owner, chunk.len());
    let sequence = state.sessions.append_chunk(&session_id, &chunk).await?;

    Ok(Json(UploadChunkResponse {
        message: "Chunk received".to_string(),
        session_id,
        sequence,
        chunk_size: chunk.len(),
    }))
}

/// POST /api/finalize-session?session_id=
/// Assemble the session's chunks into a track
pub async fn finalize_session(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Query(query): Query<FinalizeQuery>,
) -> Result<Json<FinalizeResponse>, ApiError> {
    let session_id = parse_session_id(&query.session_id)?;
    state
        .sessions
        .require_session_owner(&session_id, &owner)
        .await?;

    let track_id = state.assembler.finalize(&session_id).await?;
    info!(
        "Session {}... finalized, created track: {}...",
        session_id.short(),
        track_id.short()
    );

    Ok(Json(FinalizeResponse {
        message: "Session finalized".to_string(),
        track_id,
    }))
}

/// GET /api/sessions
/// The caller's sessions still held in memory, oldest first
pub async fn list_sessions(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Json<Vec<SessionSnapshot>> {
    Json(state.sessions.list_sessions(&owner).await)
}

/// GET /api/sessions/:session_id
/// Status of one of the caller's sessions
pub async fn get_session(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let session_id = parse_session_id(&session_id)?;
    state
        .sessions
        .require_session_owner(&session_id, &owner)
        .await?;

    Ok(Json(state.sessions.get_session(&session_id).await?))
}

/// GET /api/tracks
/// All tracks recorded by the caller
pub async fn list_tracks(
    State(state): State<AppState>,
    Principal(owner): Principal,
) -> Json<Vec<TrackSummary>> {
    Json(state.catalog.list_by_owner(&owner).await)
}

/// GET /api/download/:track_id
/// Download a track as a WAV attachment
pub async fn download_track(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(track_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let track_id = parse_track_id(&track_id)?;
    let bytes = state.catalog.fetch(&track_id, &owner).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        storage::track_filename(&track_id)
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "audio/wav".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// DELETE /api/tracks/:track_id
/// Delete one of the caller's tracks
pub async fn delete_track(
    State(state): State<AppState>,
    Principal(owner): Principal,
    Path(track_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let track_id = parse_track_id(&track_id)?;
    state.catalog.delete(&track_id, &owner).await?;

    Ok(Json(MessageResponse {
        message: "Track deleted successfully".to_string(),
    }))
}
