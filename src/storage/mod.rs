//! Durable byte storage for chunks and finished tracks
//!
//! Keys are relative, `/`-separated strings derived from session, track and
//! sequence identifiers (see [`chunk_key`] and [`track_key`]).

mod fs;
mod memory;

pub use fs::FsByteStore;
pub use memory::MemoryByteStore;

use crate::ids::{SessionId, TrackId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no entry stored at {0}")]
    NotFound(String),

    #[error("storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn io(key: &str, source: std::io::Error) -> Self {
        Self::Io {
            key: key.to_string(),
            source,
        }
    }
}

/// Byte-addressable store keyed by opaque path-like strings
#[async_trait::async_trait]
pub trait ByteStore: Send + Sync {
    /// Store `bytes` at `key`, replacing any previous value
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Remove the entry at `key`; `NotFound` if there is none
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Storage key of chunk `sequence` in `session_id`
pub fn chunk_key(session_id: &SessionId, sequence: u64) -> String {
    format!("sessions/session_{}/chunk_{:04}.wav", session_id, sequence)
}

/// Storage key of a finished track's artifact
pub fn track_key(track_id: &TrackId) -> String {
    format!("tracks/{}", track_filename(track_id))
}

pub fn track_filename(track_id: &TrackId) -> String {
    format!("track_{}.wav", track_id)
}
