pub mod assembler;
pub mod audio;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod ids;
pub mod ingest;
pub mod reaper;
pub mod session;
pub mod storage;

pub use assembler::Assembler;
pub use audio::{SampleEncoding, SamplePayload, WavFormat, WavHeader};
pub use auth::{BasicAuthResolver, PrincipalResolver};
pub use catalog::{require_owner, Track, TrackCatalog, TrackSummary};
pub use config::Config;
pub use error::{ErrorKind, IngestError};
pub use http::{create_router, AppState};
pub use ids::{SessionId, TrackId};
pub use ingest::Ingest;
pub use reaper::IdleReaper;
pub use session::{
    ChunkRef, IdleExpired, SessionConfig, SessionSnapshot, SessionState, SessionStore,
    TimeoutPolicy,
};
pub use storage::{ByteStore, FsByteStore, MemoryByteStore, StoreError};
