//! Recording session management
//!
//! This module provides the `SessionStore` that manages:
//! - Session identity and ownership
//! - Chunk sequencing and persistence
//! - Per-session idle deadlines
//!
//! Assembly of the stored chunks lives in [`crate::assembler`].

mod config;
mod session;
mod store;
mod timer;

pub use crate::ids::SessionId;
pub use config::{SessionConfig, TimeoutPolicy};
pub use session::{ChunkRef, SessionSnapshot, SessionState};
pub use store::SessionStore;
pub use timer::IdleExpired;

pub(crate) use session::{SessionEntry, SessionInner};
