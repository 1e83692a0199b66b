use crate::ids::SessionId;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Fired when a session has been idle for the configured timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleExpired {
    pub session_id: SessionId,

    /// Timer generation that fired; stale if the session re-armed since
    pub generation: u64,
}

/// Per-session idle deadline
///
/// Each re-arm bumps the generation and replaces the sleeping task, so an
/// event that was already in flight when a chunk arrived can be recognized
/// and ignored.
#[derive(Default)]
pub(crate) struct IdleTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl IdleTimer {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn arm(
        &mut self,
        session_id: SessionId,
        timeout: Duration,
        events: mpsc::Sender<IdleExpired>,
    ) {
        self.cancel();

        let event = IdleExpired {
            session_id,
            generation: self.generation,
        };

        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if events.send(event).await.is_err() {
                debug!("Idle reaper gone, dropping expiry for {}", session_id.short());
            }
        }));
    }

    pub(crate) fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
