// Integration tests for track listing, download and deletion

mod common;

use anyhow::Result;
use auxlee_audio::{storage, ErrorKind, Ingest, IngestError, SessionId, TrackId, WavFormat};
use common::{memory_ingest, no_expiry, pcm16_chunk, FlakyStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;

async fn record_track(ingest: &Ingest, owner: &str, frames: &[u32]) -> Result<TrackId> {
    let session_id: SessionId = ingest.sessions.create_session(owner).await;
    for &count in frames {
        ingest
            .sessions
            .append_chunk(&session_id, &pcm16_chunk(16000, 1, count, 0))
            .await?;
    }
    Ok(ingest.assembler.finalize(&session_id).await?)
}

#[tokio::test]
async fn test_alice_records_and_manages_a_track() -> Result<()> {
    let (ingest, store) = memory_ingest(no_expiry());

    let track_id = record_track(&ingest, "alice", &[100, 150, 200]).await?;
    let track = ingest.catalog.get(&track_id).await?;
    assert_eq!(track.frame_count, 450);
    assert_eq!(track.format, WavFormat::pcm16(16000, 1));

    let listed = ingest.catalog.list_by_owner("alice").await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, track_id);
    assert_eq!(listed[0].filename, format!("track_{}.wav", track_id));
    assert_eq!(listed[0].frame_count, 450);
    assert!((listed[0].duration_secs - 450.0 / 16000.0).abs() < 1e-9);

    let err = ingest.catalog.fetch(&track_id, "bob").await.unwrap_err();
    assert!(matches!(err, IngestError::AccessDenied));

    ingest.catalog.delete(&track_id, "alice").await?;

    let err = ingest.catalog.fetch(&track_id, "alice").await.unwrap_err();
    assert!(matches!(err, IngestError::TrackNotFound(_)));
    assert!(ingest.catalog.list_by_owner("alice").await.is_empty());
    assert!(!store.contains(&storage::track_key(&track_id)).await);

    Ok(())
}

#[tokio::test]
async fn test_non_owner_delete_is_denied_and_track_survives() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());
    let track_id = record_track(&ingest, "alice", &[100]).await?;

    let err = ingest.catalog.delete(&track_id, "bob").await.unwrap_err();
    assert!(matches!(err, IngestError::AccessDenied));
    assert_eq!(err.kind(), ErrorKind::AccessDenied);

    let bytes = ingest.catalog.fetch(&track_id, "alice").await?;
    assert!(!bytes.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_listing_is_owner_scoped_and_ordered() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());
    let first = record_track(&ingest, "alice", &[10]).await?;
    let bobs = record_track(&ingest, "bob", &[10]).await?;
    let second = record_track(&ingest, "alice", &[20]).await?;

    let alice: Vec<TrackId> = ingest
        .catalog
        .list_by_owner("alice")
        .await
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(alice, vec![first, second]);

    let bob: Vec<TrackId> = ingest
        .catalog
        .list_by_owner("bob")
        .await
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(bob, vec![bobs]);

    assert!(ingest.catalog.list_by_owner("carol").await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_unknown_track_is_not_found() {
    let (ingest, _store) = memory_ingest(no_expiry());
    let missing = TrackId::new();

    assert!(matches!(
        ingest.catalog.get(&missing).await,
        Err(IngestError::TrackNotFound(_))
    ));
    assert!(matches!(
        ingest.catalog.fetch(&missing, "alice").await,
        Err(IngestError::TrackNotFound(_))
    ));
    assert!(matches!(
        ingest.catalog.delete(&missing, "alice").await,
        Err(IngestError::TrackNotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_byte_delete_keeps_entry_and_bytes() -> Result<()> {
    let store = Arc::new(FlakyStore::default());
    let ingest = Ingest::start(store.clone(), no_expiry());
    let track_id = record_track(&ingest, "alice", &[100]).await?;

    store.fail_deletes.store(true, Ordering::SeqCst);
    let err = ingest.catalog.delete(&track_id, "alice").await.unwrap_err();
    assert!(matches!(err, IngestError::Io(_)));

    // Neither half of the deletion is visible
    assert_eq!(ingest.catalog.list_by_owner("alice").await.len(), 1);
    assert!(!ingest.catalog.fetch(&track_id, "alice").await?.is_empty());

    store.fail_deletes.store(false, Ordering::SeqCst);
    ingest.catalog.delete(&track_id, "alice").await?;
    assert!(ingest.catalog.get(&track_id).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_concurrent_fetch_and_delete_never_see_half_deleted_track() -> Result<()> {
    let (ingest, _store) = memory_ingest(no_expiry());
    let track_id = record_track(&ingest, "alice", &[400]).await?;

    let readers = (0..16).map(|_| {
        let catalog = Arc::clone(&ingest.catalog);
        tokio::spawn(async move { catalog.fetch(&track_id, "alice").await })
    });
    let catalog = Arc::clone(&ingest.catalog);
    let deleter = tokio::spawn(async move { catalog.delete(&track_id, "alice").await });

    for result in futures::future::join_all(readers).await {
        match result? {
            Ok(bytes) => assert!(!bytes.is_empty()),
            Err(IngestError::TrackNotFound(_)) => {}
            Err(other) => panic!("Reader observed a partial delete: {}", other),
        }
    }
    deleter.await??;

    Ok(())
}
