use crate::assembler::Assembler;
use crate::catalog::TrackCatalog;
use crate::reaper::IdleReaper;
use crate::session::{SessionConfig, SessionStore};
use crate::storage::ByteStore;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// The wired ingest core: session store, assembler, track catalog and the
/// idle reaper driving expiry
///
/// Must be started inside a tokio runtime.
pub struct Ingest {
    pub sessions: Arc<SessionStore>,
    pub assembler: Arc<Assembler>,
    pub catalog: Arc<TrackCatalog>,
    reaper: JoinHandle<()>,
}

impl Ingest {
    pub fn start(store: Arc<dyn ByteStore>, config: SessionConfig) -> Self {
        let (sessions, idle_events) = SessionStore::new(Arc::clone(&store), config);
        let sessions = Arc::new(sessions);
        let catalog = Arc::new(TrackCatalog::new(store));
        let assembler = Arc::new(Assembler::new(
            Arc::clone(&sessions),
            Arc::clone(&catalog),
        ));
        let reaper = IdleReaper::spawn(Arc::clone(&assembler), idle_events);

        Self {
            sessions,
            assembler,
            catalog,
            reaper,
        }
    }
}

impl Drop for Ingest {
    fn drop(&mut self) {
        self.reaper.abort();
    }
}
