//! Request principal resolution
//!
//! The ingest core only needs a stable owner string per request; how that is
//! derived from credentials is behind [`PrincipalResolver`].

use crate::error::{IngestError, Result};
use axum::http::{header, HeaderMap};
use base64::Engine;
use std::collections::HashMap;

pub trait PrincipalResolver: Send + Sync {
    /// Owner identifier for the request, or `Unauthorized`
    fn resolve(&self, headers: &HeaderMap) -> Result<String>;
}

/// HTTP Basic authentication against a static user table
pub struct BasicAuthResolver {
    users: HashMap<String, String>,
}

impl BasicAuthResolver {
    pub fn new(users: HashMap<String, String>) -> Self {
        Self { users }
    }

    fn credentials(headers: &HeaderMap) -> Result<(String, String)> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| IngestError::Unauthorized("missing credentials".to_string()))?
            .to_str()
            .map_err(|_| IngestError::Unauthorized("malformed authorization header".to_string()))?;

        let encoded = value
            .strip_prefix("Basic ")
            .ok_or_else(|| IngestError::Unauthorized("expected Basic credentials".to_string()))?;

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| IngestError::Unauthorized("malformed Basic credentials".to_string()))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| IngestError::Unauthorized("malformed Basic credentials".to_string()))?;

        let (username, password) = decoded
            .split_once(':')
            .ok_or_else(|| IngestError::Unauthorized("malformed Basic credentials".to_string()))?;

        Ok((username.to_string(), password.to_string()))
    }
}

impl PrincipalResolver for BasicAuthResolver {
    fn resolve(&self, headers: &HeaderMap) -> Result<String> {
        let (username, password) = Self::credentials(headers)?;

        match self.users.get(&username) {
            Some(expected) if constant_time_eq(password.as_bytes(), expected.as_bytes()) => {
                Ok(username)
            }
            _ => Err(IngestError::Unauthorized(
                "incorrect username or password".to_string(),
            )),
        }
    }
}

/// Byte comparison whose running time does not depend on where inputs differ
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
