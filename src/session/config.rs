use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens when a session sees no new chunk for the idle timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Assemble the chunks received so far into a track
    #[default]
    AutoFinalize,
    /// Close the session without producing a track
    Expire,
}

/// Session lifecycle configuration shared by every session in a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle period after which a session is closed (None disables expiry)
    /// Default: 60 minutes
    pub idle_timeout: Option<Duration>,

    /// Action taken when the idle timeout fires
    pub on_timeout: TimeoutPolicy,

    /// Remove raw chunk bytes once a track has been assembled from them
    pub discard_chunks_after_finalize: bool,

    /// How long finalized or expired sessions stay queryable before they are
    /// evicted from memory (None keeps them for the life of the process)
    /// Default: 60 minutes
    pub retain_closed: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(60 * 60)),
            on_timeout: TimeoutPolicy::AutoFinalize,
            discard_chunks_after_finalize: false,
            retain_closed: Some(Duration::from_secs(60 * 60)),
        }
    }
}
