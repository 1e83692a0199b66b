use crate::assembler::Assembler;
use crate::auth::PrincipalResolver;
use crate::catalog::TrackCatalog;
use crate::ingest::Ingest;
use crate::session::SessionStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub assembler: Arc<Assembler>,
    pub catalog: Arc<TrackCatalog>,

    /// Maps request credentials to an owner
    pub resolver: Arc<dyn PrincipalResolver>,

    /// Service name reported by `GET /`
    pub service_name: String,

    /// Largest accepted chunk upload in bytes
    pub max_chunk_bytes: usize,
}

impl AppState {
    pub fn new(
        ingest: &Ingest,
        resolver: Arc<dyn PrincipalResolver>,
        service_name: impl Into<String>,
        max_chunk_bytes: usize,
    ) -> Self {
        Self {
            sessions: Arc::clone(&ingest.sessions),
            assembler: Arc::clone(&ingest.assembler),
            catalog: Arc::clone(&ingest.catalog),
            resolver,
            service_name: service_name.into(),
            max_chunk_bytes,
        }
    }
}
