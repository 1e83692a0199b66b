// Integration tests for session lifecycle and chunk sequencing

mod common;

use anyhow::Result;
use auxlee_audio::{
    storage, FsByteStore, Ingest, IngestError, SessionConfig, SessionId, SessionState,
    SessionStore, TimeoutPolicy,
};
use common::{idle_after, memory_ingest, no_expiry, pcm16_chunk};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

const RETAIN: Duration = Duration::from_secs(5 * 60);

#[tokio::test]
async fn test_create_session_starts_open_and_empty() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());

    let session_id = ingest.sessions.create_session("alice").await;
    let session = ingest.sessions.get_session(&session_id).await?;

    assert_eq!(session.id, session_id);
    assert_eq!(session.owner, "alice");
    assert_eq!(session.state, SessionState::Open);
    assert_eq!(session.chunk_count(), 0);
    assert!(session.track_id.is_none());

    let other = ingest.sessions.create_session("alice").await;
    assert_ne!(other, session_id, "Session IDs must be unique");

    Ok(())
}

#[tokio::test]
async fn test_append_assigns_monotonic_sequence_and_persists() -> Result<()> {
    let (ingest, store) = memory_ingest(no_expiry());
    let session_id = ingest.sessions.create_session("alice").await;

    for expected in 0..5u64 {
        let chunk = pcm16_chunk(16000, 1, 10, expected as i16);
        let sequence = ingest.sessions.append_chunk(&session_id, &chunk).await?;
        assert_eq!(sequence, expected);
    }

    let session = ingest.sessions.get_session(&session_id).await?;
    let sequences: Vec<u64> = session.chunks.iter().map(|c| c.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4]);

    for chunk in &session.chunks {
        assert_eq!(chunk.key, storage::chunk_key(&session_id, chunk.sequence));
        assert!(store.contains(&chunk.key).await, "Chunk {} not stored", chunk.sequence);
    }
    assert_eq!(
        session.total_bytes,
        session.chunks.iter().map(|c| c.size_bytes).sum::<usize>()
    );

    Ok(())
}

#[tokio::test]
async fn test_append_does_not_validate_audio() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());
    let session_id = ingest.sessions.create_session("alice").await;

    let sequence = ingest
        .sessions
        .append_chunk(&session_id, b"half a WAV header")
        .await?;
    assert_eq!(sequence, 0);

    Ok(())
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (ingest, _store) = memory_ingest(no_expiry());
    let missing = SessionId::new();

    let err = ingest
        .sessions
        .append_chunk(&missing, &pcm16_chunk(16000, 1, 10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::SessionNotFound(_)));

    let err = ingest.sessions.get_session(&missing).await.unwrap_err();
    assert!(matches!(err, IngestError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_append_after_finalize_is_rejected() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());
    let session_id = ingest.sessions.create_session("alice").await;
    ingest
        .sessions
        .append_chunk(&session_id, &pcm16_chunk(16000, 1, 10, 0))
        .await?;
    ingest.assembler.finalize(&session_id).await?;

    let err = ingest
        .sessions
        .append_chunk(&session_id, &pcm16_chunk(16000, 1, 10, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::SessionClosed(_)));

    let session = ingest.sessions.get_session(&session_id).await?;
    assert_eq!(session.chunk_count(), 1, "No chunk may be recorded after finalization");

    Ok(())
}

#[tokio::test]
async fn test_session_ownership_check() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());
    let session_id = ingest.sessions.create_session("alice").await;

    ingest
        .sessions
        .require_session_owner(&session_id, "alice")
        .await?;
    let err = ingest
        .sessions
        .require_session_owner(&session_id, "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::AccessDenied));

    Ok(())
}

#[tokio::test]
async fn test_list_sessions_filters_by_owner_in_creation_order() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());
    let first = ingest.sessions.create_session("alice").await;
    ingest.sessions.create_session("bob").await;
    let second = ingest.sessions.create_session("alice").await;

    let listed: Vec<SessionId> = ingest
        .sessions
        .list_sessions("alice")
        .await
        .into_iter()
        .map(|s| s.id)
        .collect();

    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first) && listed.contains(&second));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_appends_get_distinct_sequences() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());
    let sessions: Arc<SessionStore> = ingest.sessions.clone();
    let session_id = sessions.create_session("alice").await;

    let appends = (0..20).map(|i| {
        let sessions = Arc::clone(&sessions);
        tokio::spawn(async move {
            sessions
                .append_chunk(&session_id, &pcm16_chunk(16000, 1, 8, i))
                .await
        })
    });

    let mut sequences = Vec::new();
    for result in futures::future::join_all(appends).await {
        sequences.push(result??);
    }
    sequences.sort_unstable();

    assert_eq!(sequences, (0..20).collect::<Vec<u64>>());

    Ok(())
}

#[tokio::test]
async fn test_filesystem_store_layout() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let store = FsByteStore::new(temp_dir.path()).await?;
    let ingest = Ingest::start(Arc::new(store), no_expiry());

    let session_id = ingest.sessions.create_session("alice").await;
    ingest
        .sessions
        .append_chunk(&session_id, &pcm16_chunk(16000, 1, 10, 0))
        .await?;

    let chunk_path = temp_dir
        .path()
        .join(format!("sessions/session_{}/chunk_0000.wav", session_id));
    assert!(chunk_path.exists(), "Chunk file should exist at {:?}", chunk_path);

    let track_id = ingest.assembler.finalize(&session_id).await?;
    let track_path = temp_dir
        .path()
        .join(format!("tracks/track_{}.wav", track_id));
    assert!(track_path.exists(), "Track file should exist at {:?}", track_path);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_closed_sessions_are_evicted_after_retention() -> Result<()> {
    let config = SessionConfig {
        retain_closed: Some(RETAIN),
        ..no_expiry()
    };
    let (ingest, _store) = memory_ingest(config);

    let finalized = ingest.sessions.create_session("alice").await;
    ingest
        .sessions
        .append_chunk(&finalized, &pcm16_chunk(16000, 1, 10, 0))
        .await?;
    let track_id = ingest.assembler.finalize(&finalized).await?;
    let open = ingest.sessions.create_session("alice").await;

    // Within the window the closed session is still queryable
    sleep(RETAIN - Duration::from_secs(90)).await;
    assert_eq!(
        ingest.sessions.get_session(&finalized).await?.state,
        SessionState::Finalized
    );

    sleep(Duration::from_secs(3 * 60)).await;

    let err = ingest.sessions.get_session(&finalized).await.unwrap_err();
    assert!(matches!(err, IngestError::SessionNotFound(_)));
    assert_eq!(
        ingest.sessions.get_session(&open).await?.state,
        SessionState::Open,
        "Open sessions are never evicted"
    );
    assert_eq!(ingest.sessions.list_sessions("alice").await.len(), 1);

    // The track outlives its session
    assert_eq!(ingest.catalog.get(&track_id).await?.frame_count, 10);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_expired_sessions_are_evicted_too() -> Result<()> {
    let config = SessionConfig {
        retain_closed: Some(RETAIN),
        ..idle_after(Duration::from_secs(60), TimeoutPolicy::Expire)
    };
    let (ingest, _store) = memory_ingest(config);
    let session_id = ingest.sessions.create_session("alice").await;

    sleep(Duration::from_secs(61)).await;
    assert_eq!(
        ingest.sessions.get_session(&session_id).await?.state,
        SessionState::Expired
    );

    sleep(RETAIN + Duration::from_secs(2 * 60)).await;
    assert!(ingest.sessions.list_sessions("alice").await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_eviction_disabled_keeps_closed_sessions() -> Result<()> {
    let (ingest, _store) = memory_ingest(SessionConfig {
        retain_closed: None,
        ..no_expiry()
    });
    let session_id = ingest.sessions.create_session("alice").await;
    ingest
        .sessions
        .append_chunk(&session_id, &pcm16_chunk(16000, 1, 10, 0))
        .await?;
    ingest.assembler.finalize(&session_id).await?;

    assert_eq!(ingest.sessions.evict_closed().await, 0);
    assert!(ingest.sessions.get_session(&session_id).await.is_ok());

    Ok(())
}
