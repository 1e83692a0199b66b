use super::config::SessionConfig;
use super::session::{ChunkRef, SessionEntry, SessionInner, SessionSnapshot, SessionState};
use super::timer::IdleExpired;
use crate::error::{IngestError, Result};
use crate::ids::SessionId;
use crate::storage::{self, ByteStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

/// Capacity of the idle-expiry event channel
const IDLE_EVENT_BUFFER: usize = 100;

/// Process-wide registry of recording sessions
///
/// The map itself sits behind a registry lock that is only held for lookups
/// and inserts. Everything mutable about a session lives behind that
/// session's own mutex, so unrelated sessions never wait on each other.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry>>>,
    store: Arc<dyn ByteStore>,
    config: SessionConfig,
    idle_tx: mpsc::Sender<IdleExpired>,
}

impl SessionStore {
    /// Create an empty store
    ///
    /// Idle-expiry events are delivered on the returned receiver; hand it to
    /// an [`crate::IdleReaper`] to act on them.
    pub fn new(
        store: Arc<dyn ByteStore>,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<IdleExpired>) {
        let (idle_tx, idle_rx) = mpsc::channel(IDLE_EVENT_BUFFER);

        info!(
            "Session store initialized (backend: {}, idle timeout: {:?}, on timeout: {:?}, \
             closed sessions kept: {:?})",
            store.name(),
            config.idle_timeout,
            config.on_timeout,
            config.retain_closed
        );

        (
            Self {
                sessions: RwLock::new(HashMap::new()),
                store,
                config,
                idle_tx,
            },
            idle_rx,
        )
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn byte_store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }

    /// Open a new session owned by `owner`
    pub async fn create_session(&self, owner: &str) -> SessionId {
        let entry = Arc::new(SessionEntry::new(owner));
        let session_id = entry.id;

        {
            let mut inner = entry.inner.lock().await;
            self.arm_idle_timer(session_id, &mut inner);
        }

        self.sessions.write().await.insert(session_id, entry);

        info!(
            "Created new session {}... for user '{}'",
            session_id.short(),
            owner
        );

        session_id
    }

    /// Persist `bytes` as the next chunk of the session and return its sequence number
    ///
    /// The chunk is not inspected; malformed audio is only reported when the
    /// session is finalized.
    pub async fn append_chunk(&self, session_id: &SessionId, bytes: &[u8]) -> Result<u64> {
        let entry = self.entry(session_id).await?;
        let mut inner = entry.inner.lock().await;

        if inner.state != SessionState::Open {
            warn!(
                "Chunk rejected: session {}... is {}",
                session_id.short(),
                inner.state
            );
            return Err(IngestError::SessionClosed(session_id.to_string()));
        }

        let sequence = inner.chunks.len() as u64;
        let key = storage::chunk_key(session_id, sequence);
        self.store.write(&key, bytes).await?;

        let now = Utc::now();
        inner.chunks.push(ChunkRef {
            sequence,
            key,
            size_bytes: bytes.len(),
            received_at: now,
        });
        inner.last_activity_at = now;
        self.arm_idle_timer(*session_id, &mut inner);

        info!(
            "Chunk #{} received: {:.2} KB (session {}...)",
            sequence,
            bytes.len() as f64 / 1024.0,
            session_id.short()
        );

        Ok(sequence)
    }

    pub async fn get_session(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        let entry = self.entry(session_id).await?;
        let inner = entry.inner.lock().await;
        Ok(entry.snapshot(&inner))
    }

    /// All sessions created by `owner`, oldest first
    pub async fn list_sessions(&self, owner: &str) -> Vec<SessionSnapshot> {
        let entries: Vec<Arc<SessionEntry>> = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .filter(|entry| entry.owner == owner)
                .cloned()
                .collect()
        };

        let mut snapshots = Vec::with_capacity(entries.len());
        for entry in entries {
            let inner = entry.inner.lock().await;
            snapshots.push(entry.snapshot(&inner));
        }
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }

    /// Fail with `AccessDenied` unless `requester` created the session
    pub async fn require_session_owner(
        &self,
        session_id: &SessionId,
        requester: &str,
    ) -> Result<()> {
        let entry = self.entry(session_id).await?;
        if entry.owner != requester {
            warn!(
                "User '{}' denied access to session {}...",
                requester,
                session_id.short()
            );
            return Err(IngestError::AccessDenied);
        }
        Ok(())
    }

    /// Drop sessions that have been closed for longer than the retention window
    ///
    /// Sessions whose lock is busy are skipped until the next sweep. Returns
    /// the number of sessions evicted.
    pub async fn evict_closed(&self) -> usize {
        let retain = match self.config.retain_closed {
            Some(retain) => retain,
            None => return 0,
        };

        let entries: Vec<Arc<SessionEntry>> =
            self.sessions.read().await.values().cloned().collect();
        let evictable: Vec<SessionId> = entries
            .iter()
            .filter(|entry| {
                entry
                    .inner
                    .try_lock()
                    .map_or(false, |inner| inner.evictable(retain))
            })
            .map(|entry| entry.id)
            .collect();

        if evictable.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for session_id in &evictable {
            sessions.remove(session_id);
        }

        info!(
            "Evicted {} closed sessions ({} remaining)",
            evictable.len(),
            sessions.len()
        );
        evictable.len()
    }

    pub(crate) async fn entry(&self, session_id: &SessionId) -> Result<Arc<SessionEntry>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| IngestError::SessionNotFound(session_id.to_string()))
    }

    pub(crate) fn arm_idle_timer(&self, session_id: SessionId, inner: &mut SessionInner) {
        if let Some(timeout) = self.config.idle_timeout {
            inner.timer.arm(session_id, timeout, self.idle_tx.clone());
        }
    }
}
