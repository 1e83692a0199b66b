use crate::session::{SessionConfig, TimeoutPolicy};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Prefix for environment overrides, e.g. `AUXLEE__SERVICE__HTTP__PORT=9000`
const ENV_PREFIX: &str = "AUXLEE";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub session: SessionSettings,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub audio_storage_path: String,
    pub max_chunk_size_mb: u64,
    pub discard_chunks_after_finalize: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Minutes without a new chunk before the timeout policy applies (0 disables)
    pub timeout_minutes: u64,
    pub on_timeout: TimeoutPolicy,

    /// Minutes a finalized or expired session stays queryable (0 keeps it forever)
    pub retain_closed_minutes: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// username → password
    pub users: HashMap<String, String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "Auxlee Audio API".to_string(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audio_storage_path: "./audio_storage".to_string(),
            max_chunk_size_mb: 10,
            discard_chunks_after_finalize: false,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_minutes: 60,
            on_timeout: TimeoutPolicy::AutoFinalize,
            retain_closed_minutes: 60,
        }
    }
}

impl Config {
    /// Load `path` (any extension the `config` crate understands, optional)
    /// and apply `AUXLEE__*` environment overrides on top of the defaults
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            idle_timeout: optional_minutes(
                "session.timeout_minutes",
                self.session.timeout_minutes,
            )?,
            on_timeout: self.session.on_timeout,
            discard_chunks_after_finalize: self.storage.discard_chunks_after_finalize,
            retain_closed: optional_minutes(
                "session.retain_closed_minutes",
                self.session.retain_closed_minutes,
            )?,
        })
    }

    pub fn max_chunk_bytes(&self) -> Result<usize> {
        let mb = self.storage.max_chunk_size_mb;
        mb.checked_mul(1024 * 1024)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(|| anyhow!("storage.max_chunk_size_mb = {} is too large", mb))
    }
}

/// Minutes as a duration, with 0 meaning "disabled"
fn optional_minutes(key: &str, minutes: u64) -> Result<Option<Duration>> {
    match minutes {
        0 => Ok(None),
        minutes => minutes
            .checked_mul(60)
            .map(|secs| Some(Duration::from_secs(secs)))
            .ok_or_else(|| anyhow!("{} = {} is too large", key, minutes)),
    }
}
