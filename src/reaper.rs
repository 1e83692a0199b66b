use crate::assembler::Assembler;
use crate::session::IdleExpired;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// How often closed sessions are checked against the retention window
const EVICTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Background task applying the idle-timeout policy and evicting closed
/// sessions
///
/// Session timers only send an [`IdleExpired`] event; the reaper does the work.
pub struct IdleReaper;

impl IdleReaper {
    pub fn spawn(
        assembler: Arc<Assembler>,
        mut events: mpsc::Receiver<IdleExpired>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Idle reaper task started");

            let mut sweep = tokio::time::interval(EVICTION_SWEEP_INTERVAL);
            sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        Self::handle(&assembler, event).await;
                    }
                    _ = sweep.tick() => {
                        assembler.sessions().evict_closed().await;
                    }
                }
            }

            info!("Idle reaper task stopped");
        })
    }

    async fn handle(assembler: &Assembler, event: IdleExpired) {
        match assembler.expire(event).await {
            Ok(Some(track_id)) => info!(
                "Idle session {}... auto-finalized into track {}...",
                event.session_id.short(),
                track_id.short()
            ),
            Ok(None) => {}
            Err(e) => error!(
                "Idle expiry of session {}... failed: {}",
                event.session_id.short(),
                e
            ),
        }
    }
}
