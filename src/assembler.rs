//! Session finalization: chunk validation, concatenation and track registration
//!
//! Finalization runs entirely under the session's own lock, so it can never
//! interleave with an append on the same session. All fallible work happens
//! before the session changes state, and catalog registration is the last
//! step; a failure anywhere leaves the session `Open` with no track.

use crate::audio::{wav, SamplePayload, WavFormat};
use crate::catalog::{Track, TrackCatalog};
use crate::error::{IngestError, Result};
use crate::ids::{SessionId, TrackId};
use crate::session::{
    ChunkRef, IdleExpired, SessionEntry, SessionInner, SessionState, SessionStore, TimeoutPolicy,
};
use crate::storage::{self, StoreError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct Assembler {
    sessions: Arc<SessionStore>,
    catalog: Arc<TrackCatalog>,
}

/// Artifact built from a session's chunks, not yet persisted
struct Assembled {
    format: WavFormat,
    frame_count: u64,
    bytes: Vec<u8>,
}

impl Assembler {
    pub fn new(sessions: Arc<SessionStore>, catalog: Arc<TrackCatalog>) -> Self {
        Self { sessions, catalog }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn catalog(&self) -> &Arc<TrackCatalog> {
        &self.catalog
    }

    /// Concatenate every chunk of an open session into a new track
    pub async fn finalize(&self, session_id: &SessionId) -> Result<TrackId> {
        let entry = self.sessions.entry(session_id).await?;
        let mut inner = entry.inner.lock().await;

        match inner.state {
            SessionState::Open => {}
            SessionState::Finalized => {
                return Err(IngestError::AlreadyFinalized(session_id.to_string()))
            }
            SessionState::Expired => {
                return Err(IngestError::SessionClosed(session_id.to_string()))
            }
        }

        match self.finalize_locked(&entry, &mut inner).await {
            Ok(track_id) => Ok(track_id),
            Err(e) => {
                error!("Error finalizing session {}...: {}", session_id.short(), e);
                Err(e)
            }
        }
    }

    /// Apply the idle-timeout policy to a session whose timer fired
    ///
    /// Returns the track produced by auto-finalization, if any. Events from
    /// a timer that has since been re-armed or cancelled are ignored. A
    /// storage failure while auto-finalizing leaves the session `Open` with
    /// a fresh idle deadline; any other failure marks it `Expired`.
    pub async fn expire(&self, event: IdleExpired) -> Result<Option<TrackId>> {
        let entry = match self.sessions.entry(&event.session_id).await {
            Ok(entry) => entry,
            Err(_) => return Ok(None),
        };
        let mut inner = entry.inner.lock().await;

        if inner.state != SessionState::Open || inner.timer.generation() != event.generation {
            debug!(
                "Ignoring stale idle expiry for session {}...",
                event.session_id.short()
            );
            return Ok(None);
        }

        match self.sessions.config().on_timeout {
            TimeoutPolicy::Expire => {
                inner.close(SessionState::Expired, None);
                info!(
                    "Session {}... expired after inactivity ({} chunks kept)",
                    event.session_id.short(),
                    inner.chunks.len()
                );
                Ok(None)
            }
            TimeoutPolicy::AutoFinalize => {
                info!(
                    "Session {}... idle, auto-finalizing",
                    event.session_id.short()
                );
                match self.finalize_locked(&entry, &mut inner).await {
                    Ok(track_id) => Ok(Some(track_id)),
                    Err(e @ (IngestError::FinalizeIo { .. } | IngestError::Io(_))) => {
                        // Stays open; the re-armed timer retries
                        self.sessions.arm_idle_timer(event.session_id, &mut inner);
                        warn!(
                            "Auto-finalize of session {}... hit a storage error, retrying after \
                             the next idle period: {}",
                            event.session_id.short(),
                            e
                        );
                        Err(e)
                    }
                    Err(e) => {
                        // The chunks can never assemble; close instead of retrying forever
                        inner.close(SessionState::Expired, None);
                        warn!(
                            "Auto-finalize of session {}... failed, marked expired: {}",
                            event.session_id.short(),
                            e
                        );
                        Err(e)
                    }
                }
            }
        }
    }

    async fn finalize_locked(
        &self,
        entry: &SessionEntry,
        inner: &mut SessionInner,
    ) -> Result<TrackId> {
        let session_id = entry.id;
        if inner.chunks.is_empty() {
            return Err(IngestError::EmptySession(session_id.to_string()));
        }

        let assembled = self.assemble(&session_id, &inner.chunks).await?;

        let track_id = self.catalog.mint_id().await;
        let key = storage::track_key(&track_id);
        let store = self.sessions.byte_store();
        store
            .write(&key, &assembled.bytes)
            .await
            .map_err(|source| finalize_io(&session_id, source))?;

        let track = Track {
            id: track_id,
            owner: entry.owner.clone(),
            source_session_id: session_id,
            filename: storage::track_filename(&track_id),
            key: key.clone(),
            format: assembled.format,
            frame_count: assembled.frame_count,
            chunk_count: inner.chunks.len(),
            size_bytes: assembled.bytes.len() as u64,
            created_at: Utc::now(),
        };

        if let Err(e) = self.catalog.register(track).await {
            // The key may now belong to the colliding track; leave it as an orphan
            warn!("Artifact {} written but not registered: {}", key, e);
            return Err(e);
        }

        inner.close(SessionState::Finalized, Some(track_id));

        info!(
            "Session {}... finalized: {} chunks -> {:.2} MB track {}...",
            session_id.short(),
            inner.chunks.len(),
            assembled.bytes.len() as f64 / (1024.0 * 1024.0),
            track_id.short()
        );

        if self.sessions.config().discard_chunks_after_finalize {
            self.discard_chunks(&session_id, &inner.chunks).await;
        }

        Ok(track_id)
    }

    /// Validate and concatenate chunks in sequence order
    async fn assemble(&self, session_id: &SessionId, chunks: &[ChunkRef]) -> Result<Assembled> {
        let store = self.sessions.byte_store();

        let mut canonical: Option<WavFormat> = None;
        let mut payload: Option<SamplePayload> = None;
        let mut frame_count: u64 = 0;

        for chunk in chunks {
            let bytes = store
                .read(&chunk.key)
                .await
                .map_err(|source| finalize_io(session_id, source))?;

            let corrupt = |e: wav::CodecError| IngestError::CorruptFormat {
                sequence: chunk.sequence,
                reason: e.to_string(),
            };

            let header = wav::parse_header(&bytes).map_err(corrupt)?;
            match canonical {
                None => canonical = Some(header.format),
                Some(expected) if expected != header.format => {
                    return Err(IngestError::FormatMismatch {
                        sequence: chunk.sequence,
                        expected,
                        found: header.format,
                    });
                }
                Some(_) => {}
            }

            let frames = wav::extract_frames(&bytes).map_err(corrupt)?;
            debug!(
                "Chunk #{}: {} frames ({})",
                chunk.sequence, header.frame_count, header.format
            );

            match payload.as_mut() {
                None => payload = Some(frames),
                Some(joined) => joined.extend(frames).map_err(corrupt)?,
            }
            frame_count += u64::from(header.frame_count);
        }

        let (format, payload) = match (canonical, payload) {
            (Some(format), Some(payload)) => (format, payload),
            _ => return Err(IngestError::EmptySession(session_id.to_string())),
        };

        let bytes = wav::build_container(format, &payload)
            .map_err(|e| IngestError::AssemblyFailed(e.to_string()))?;

        Ok(Assembled {
            format,
            frame_count,
            bytes,
        })
    }

    async fn discard_chunks(&self, session_id: &SessionId, chunks: &[ChunkRef]) {
        let store = self.sessions.byte_store();
        for chunk in chunks {
            if let Err(e) = store.delete(&chunk.key).await {
                warn!(
                    "Failed to discard chunk #{} of session {}...: {}",
                    chunk.sequence,
                    session_id.short(),
                    e
                );
            }
        }
        debug!(
            "Discarded {} raw chunks of session {}...",
            chunks.len(),
            session_id.short()
        );
    }
}

fn finalize_io(session_id: &SessionId, source: StoreError) -> IngestError {
    IngestError::FinalizeIo {
        session_id: session_id.to_string(),
        source,
    }
}
