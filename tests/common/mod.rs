// Shared fixtures for integration tests
#![allow(dead_code)]

use auxlee_audio::{ByteStore, Ingest, MemoryByteStore, SessionConfig, StoreError, TimeoutPolicy};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Build a 16-bit PCM WAV chunk whose samples count up from `first_sample`
///
/// Consecutive values make it easy to check that assembled payloads keep
/// chunk order.
pub fn pcm16_chunk(sample_rate: u32, channels: u16, frames: u32, first_sample: i16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        let mut value = first_sample;
        for _ in 0..frames * channels as u32 {
            writer.write_sample(value).unwrap();
            value = value.wrapping_add(1);
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// All i16 samples of a WAV file
pub fn read_samples(bytes: &[u8]) -> Vec<i16> {
    hound::WavReader::new(Cursor::new(bytes))
        .unwrap()
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

pub fn no_expiry() -> SessionConfig {
    SessionConfig {
        idle_timeout: None,
        ..SessionConfig::default()
    }
}

pub fn idle_after(timeout: Duration, policy: TimeoutPolicy) -> SessionConfig {
    SessionConfig {
        idle_timeout: Some(timeout),
        on_timeout: policy,
        discard_chunks_after_finalize: false,
        retain_closed: None,
    }
}

pub fn memory_ingest(config: SessionConfig) -> (Ingest, Arc<MemoryByteStore>) {
    let store = Arc::new(MemoryByteStore::new());
    let ingest = Ingest::start(store.clone(), config);
    (ingest, store)
}

/// Memory store whose writes under `tracks/` fail while `fail_track_writes` is set
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryByteStore,
    pub fail_track_writes: AtomicBool,
    pub fail_deletes: AtomicBool,

    /// Writes under `tracks/` attempted so far, failed or not
    pub track_writes: AtomicUsize,
}

#[async_trait::async_trait]
impl ByteStore for FlakyStore {
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if !key.starts_with("tracks/") {
            return self.inner.write(key, bytes).await;
        }
        self.track_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_track_writes.load(Ordering::SeqCst) {
            return Err(StoreError::io(
                key,
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            ));
        }
        self.inner.write(key, bytes).await
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.inner.read(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::io(
                key,
                std::io::Error::new(std::io::ErrorKind::Other, "device busy"),
            ));
        }
        self.inner.delete(key).await
    }

    fn name(&self) -> &str {
        "flaky"
    }
}
