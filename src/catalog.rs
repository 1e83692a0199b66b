//! Registry of finished tracks
//!
//! Every entry carries a liveness gate. Readers hold the shared side while
//! they read the artifact; deletion holds the exclusive side while it
//! removes the bytes, and marks the entry dead before dropping it from the
//! map. A reader therefore never sees an entry whose bytes are gone.

use crate::audio::WavFormat;
use crate::error::{IngestError, Result};
use crate::storage::{ByteStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub use crate::ids::{SessionId, TrackId};

/// A finished, immutable recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub owner: String,

    /// Session the track was assembled from (lookup only)
    pub source_session_id: SessionId,

    /// Download filename, e.g. `track_<id>.wav`
    pub filename: String,

    /// Storage key of the artifact bytes
    #[serde(skip)]
    pub key: String,

    pub format: WavFormat,

    /// Frames (samples per channel) in the artifact
    pub frame_count: u64,

    /// Number of chunks concatenated
    pub chunk_count: usize,

    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Listing view of a track; never carries audio bytes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: TrackId,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub frame_count: u64,
    pub duration_secs: f64,
    pub size_bytes: u64,
}

impl From<&Track> for TrackSummary {
    fn from(track: &Track) -> Self {
        Self {
            id: track.id,
            filename: track.filename.clone(),
            created_at: track.created_at,
            frame_count: track.frame_count,
            duration_secs: track.format.duration_seconds(track.frame_count),
            size_bytes: track.size_bytes,
        }
    }
}

struct TrackEntry {
    track: Track,
    live: RwLock<bool>,
}

pub struct TrackCatalog {
    tracks: RwLock<HashMap<TrackId, Arc<TrackEntry>>>,
    store: Arc<dyn ByteStore>,
}

impl TrackCatalog {
    pub fn new(store: Arc<dyn ByteStore>) -> Self {
        Self {
            tracks: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// A track ID not currently registered
    pub async fn mint_id(&self) -> TrackId {
        let tracks = self.tracks.read().await;
        loop {
            let id = TrackId::new();
            if !tracks.contains_key(&id) {
                return id;
            }
        }
    }

    /// Add a track whose artifact has already been persisted
    pub async fn register(&self, track: Track) -> Result<()> {
        let mut tracks = self.tracks.write().await;
        if tracks.contains_key(&track.id) {
            return Err(IngestError::DuplicateTrack(track.id.to_string()));
        }

        info!(
            "Registered track {}... for user '{}' ({} frames)",
            track.id.short(),
            track.owner,
            track.frame_count
        );

        tracks.insert(
            track.id,
            Arc::new(TrackEntry {
                track,
                live: RwLock::new(true),
            }),
        );
        Ok(())
    }

    /// Tracks owned by `owner`, oldest first
    pub async fn list_by_owner(&self, owner: &str) -> Vec<TrackSummary> {
        let tracks = self.tracks.read().await;
        let mut summaries: Vec<TrackSummary> = tracks
            .values()
            .filter(|entry| entry.track.owner == owner)
            // An entry whose gate is held exclusively is being deleted
            .filter(|entry| entry.live.try_read().map(|live| *live).unwrap_or(false))
            .map(|entry| TrackSummary::from(&entry.track))
            .collect();
        summaries.sort_by_key(|s| s.created_at);
        summaries
    }

    pub async fn get(&self, track_id: &TrackId) -> Result<Track> {
        let entry = self.entry(track_id).await?;
        let live = entry.live.read().await;
        if !*live {
            return Err(IngestError::TrackNotFound(track_id.to_string()));
        }
        Ok(entry.track.clone())
    }

    /// Artifact bytes of a track owned by `requester`
    pub async fn fetch(&self, track_id: &TrackId, requester: &str) -> Result<Vec<u8>> {
        let entry = self.entry(track_id).await?;
        require_owner(&entry.track, requester)?;

        let live = entry.live.read().await;
        if !*live {
            return Err(IngestError::TrackNotFound(track_id.to_string()));
        }

        let bytes = self.store.read(&entry.track.key).await?;
        info!(
            "User '{}' downloading track {}... ({})",
            requester,
            track_id.short(),
            entry.track.filename
        );
        Ok(bytes)
    }

    /// Remove a track owned by `requester` together with its artifact
    ///
    /// The entry is only dropped once the bytes are confirmed gone; if the
    /// store fails, both stay in place.
    pub async fn delete(&self, track_id: &TrackId, requester: &str) -> Result<()> {
        let entry = self.entry(track_id).await?;
        require_owner(&entry.track, requester)?;

        let mut live = entry.live.write().await;
        if !*live {
            return Err(IngestError::TrackNotFound(track_id.to_string()));
        }

        match self.store.delete(&entry.track.key).await {
            Ok(()) => {}
            Err(StoreError::NotFound(key)) => {
                warn!("Artifact {} already missing while deleting track", key);
            }
            Err(e) => return Err(e.into()),
        }

        *live = false;
        self.tracks.write().await.remove(track_id);

        info!(
            "User '{}' deleted track {}... ({})",
            requester,
            track_id.short(),
            entry.track.filename
        );
        Ok(())
    }

    async fn entry(&self, track_id: &TrackId) -> Result<Arc<TrackEntry>> {
        self.tracks
            .read()
            .await
            .get(track_id)
            .cloned()
            .ok_or_else(|| IngestError::TrackNotFound(track_id.to_string()))
    }
}

/// Single ownership check shared by fetch and delete
pub fn require_owner(track: &Track, requester: &str) -> Result<()> {
    if track.owner != requester {
        warn!(
            "User '{}' denied access to track {}...",
            requester,
            track.id.short()
        );
        return Err(IngestError::AccessDenied);
    }
    Ok(())
}
