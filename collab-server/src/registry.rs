//! Registry of live connections.
//!
//! Maps a session id to its owning `(user, project)` pair and the unbounded
//! channel the socket task drains. Broadcast fan-out walks the registry and
//! enqueues the event for every connection attached to the project,
//! optionally skipping the sender. A send to a closed channel is ignored:
//! the socket task noticing its channel is gone is exactly how a sweeper
//! eviction terminates a silent connection.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use collab_core::ServerEvent;
use tokio::sync::mpsc;

/// Ownership and outbound channel of one live connection.
#[derive(Debug)]
struct ConnectionHandle {
    user_id: String,
    project_id: String,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

/// Thread-safe map of session id to live connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<String, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ConnectionHandle>> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ConnectionHandle>> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Register a connection and return the receiver its socket task drains.
    pub fn register(
        &self,
        session_id: &str,
        user_id: &str,
        project_id: &str,
    ) -> mpsc::UnboundedReceiver<ServerEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.write().insert(
            session_id.to_string(),
            ConnectionHandle {
                user_id: user_id.to_string(),
                project_id: project_id.to_string(),
                sender: tx,
            },
        );
        rx
    }

    /// Remove a connection. Returns false if it was already gone.
    ///
    /// Dropping the entry closes the outbound channel, which ends a socket
    /// task that is still running (the sweeper eviction path).
    pub fn remove(&self, session_id: &str) -> bool {
        self.write().remove(session_id).is_some()
    }

    /// Whether a session is currently registered.
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.read().contains_key(session_id)
    }

    /// Enqueue an event for every connection on a project.
    ///
    /// `exclude` skips the sender for transient signals (cursor, selection)
    /// that do not need an echo. Returns the number of connections reached.
    pub fn broadcast(&self, project_id: &str, event: &ServerEvent, exclude: Option<&str>) -> usize {
        let connections = self.read();
        let mut delivered = 0;
        for (session_id, handle) in connections.iter() {
            if handle.project_id != project_id {
                continue;
            }
            if exclude == Some(session_id.as_str()) {
                continue;
            }
            if handle.sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Enqueue an event for one session. Returns false if it is gone.
    pub fn send_to(&self, session_id: &str, event: ServerEvent) -> bool {
        self.read()
            .get(session_id)
            .is_some_and(|handle| handle.sender.send(event).is_ok())
    }

    /// The `(user, project)` pair that owns a session.
    #[must_use]
    pub fn owner_of(&self, session_id: &str) -> Option<(String, String)> {
        self.read()
            .get(session_id)
            .map(|h| (h.user_id.clone(), h.project_id.clone()))
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
