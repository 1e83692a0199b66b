use crate::audio::WavFormat;
use crate::storage::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Coarse error classes surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    FormatMismatch,
    AccessDenied,
    Unauthorized,
    Io,
}

/// Errors produced by the session store, assembler and track catalog
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("session {0} not found")]
    SessionNotFound(String),

    #[error("session {0} is closed")]
    SessionClosed(String),

    #[error("session {0} is already finalized")]
    AlreadyFinalized(String),

    #[error("session {0} has no chunks")]
    EmptySession(String),

    #[error("chunk {sequence} format {found} does not match session format {expected}")]
    FormatMismatch {
        sequence: u64,
        expected: WavFormat,
        found: WavFormat,
    },

    #[error("chunk {sequence} is not a valid WAV container: {reason}")]
    CorruptFormat { sequence: u64, reason: String },

    #[error("failed to assemble track: {0}")]
    AssemblyFailed(String),

    #[error("track {0} not found")]
    TrackNotFound(String),

    #[error("track {0} already registered")]
    DuplicateTrack(String),

    #[error("access denied")]
    AccessDenied,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("failed to finalize session {session_id}: {source}")]
    FinalizeIo {
        session_id: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Io(#[from] StoreError),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SessionNotFound(_) | Self::TrackNotFound(_) => ErrorKind::NotFound,
            Self::SessionClosed(_)
            | Self::AlreadyFinalized(_)
            | Self::EmptySession(_)
            | Self::DuplicateTrack(_) => ErrorKind::Conflict,
            Self::FormatMismatch { .. } | Self::CorruptFormat { .. } | Self::AssemblyFailed(_) => {
                ErrorKind::FormatMismatch
            }
            Self::AccessDenied => ErrorKind::AccessDenied,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::FinalizeIo { .. } | Self::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
