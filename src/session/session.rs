use super::timer::IdleTimer;
use crate::ids::{SessionId, TrackId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Lifecycle state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting chunks
    Open,
    /// Assembled into a track (terminal)
    Finalized,
    /// Closed by idle expiry without a track (terminal)
    Expired,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Finalized => write!(f, "finalized"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// Reference to one stored chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRef {
    /// Position in the session (0-indexed, assigned by the store)
    pub sequence: u64,

    /// Storage key holding the chunk bytes
    pub key: String,

    /// Size of the chunk in bytes
    pub size_bytes: usize,

    /// When the chunk was accepted
    pub received_at: DateTime<Utc>,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub owner: String,
    pub state: SessionState,
    pub chunks: Vec<ChunkRef>,
    pub total_bytes: usize,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,

    /// Track produced by finalization, if any
    pub track_id: Option<TrackId>,
}

impl SessionSnapshot {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Registry entry: immutable identity plus the lock-protected mutable part
pub(crate) struct SessionEntry {
    pub(crate) id: SessionId,
    pub(crate) owner: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) inner: Mutex<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) state: SessionState,
    pub(crate) chunks: Vec<ChunkRef>,
    pub(crate) last_activity_at: DateTime<Utc>,
    pub(crate) track_id: Option<TrackId>,
    pub(crate) timer: IdleTimer,

    /// Set when the session reaches a terminal state
    pub(crate) closed_at: Option<Instant>,
}

impl SessionEntry {
    pub(crate) fn new(owner: &str) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            owner: owner.to_string(),
            created_at: now,
            inner: Mutex::new(SessionInner {
                state: SessionState::Open,
                chunks: Vec::new(),
                last_activity_at: now,
                track_id: None,
                timer: IdleTimer::default(),
                closed_at: None,
            }),
        }
    }

    pub(crate) fn snapshot(&self, inner: &SessionInner) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            owner: self.owner.clone(),
            state: inner.state,
            chunks: inner.chunks.clone(),
            total_bytes: inner.chunks.iter().map(|c| c.size_bytes).sum(),
            created_at: self.created_at,
            last_activity_at: inner.last_activity_at,
            track_id: inner.track_id,
        }
    }
}

impl SessionInner {
    /// Move to a terminal state and stop the idle timer
    pub(crate) fn close(&mut self, state: SessionState, track_id: Option<TrackId>) {
        self.state = state;
        self.track_id = track_id;
        self.closed_at = Some(Instant::now());
        self.timer.cancel();
    }

    /// True once the session has been closed for at least `retain`
    pub(crate) fn evictable(&self, retain: Duration) -> bool {
        self.closed_at
            .map_or(false, |closed_at| closed_at.elapsed() >= retain)
    }
}
