//! # Forma Collaboration Core
//!
//! Domain model for the real-time collaboration subsystem of the Forma
//! visual site builder: user presence, advisory component locks, the
//! per-project collaboration state aggregate, and the JSON wire protocol
//! spoken over the editor WebSocket.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                collab-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Presence        │  Lock manager            │
//! │  - cursors       │  - time-bounded claims   │
//! │  - selections    │  - lazy expiry           │
//! ├─────────────────────────────────────────────┤
//! │  Project state   │  Wire protocol           │
//! │  - version clock │  - tagged client events  │
//! │  - shared store  │  - tagged server events  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! This crate is transport-agnostic: every operation that depends on time
//! takes an explicit `now_ms` so lock expiry and liveness are deterministic
//! under test. The server crate supplies the clock and the sockets.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod event;
pub mod lock;
pub mod presence;
pub mod state;
pub mod store;

pub use config::{CollabConfig, USER_COLORS};
pub use error::{CollabError, CollabResult};
pub use event::{ClientEvent, ComponentChange, ServerEvent};
pub use lock::{LockType, ProjectLock};
pub use presence::{CursorPosition, UserPresence};
pub use state::{CollaborationState, StateSnapshot};
pub use store::{CollabStats, CollabStore, LeaveOutcome};

use std::time::{SystemTime, UNIX_EPOCH};

/// Collaboration core version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the current Unix timestamp in milliseconds.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
