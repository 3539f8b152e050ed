//! Per-project collaboration state.
//!
//! One [`CollaborationState`] aggregates everything a project's sessions
//! share: the presence list, the component lock map, and the document
//! version clock. It is created lazily on first join and discarded when the
//! last session leaves. All methods take explicit `now_ms` timestamps so
//! expiry and staleness are deterministic under test.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CollabError;
use crate::lock::{LockType, ProjectLock};
use crate::presence::{CursorPosition, UserPresence};

/// Shared mutable state of one project's collaboration session.
#[derive(Debug, Clone)]
pub struct CollaborationState {
    /// The project this state belongs to.
    project_id: String,
    /// Currently attached sessions.
    users: Vec<UserPresence>,
    /// Active locks keyed by component id.
    locks: HashMap<String, ProjectLock>,
    /// Document version clock; advances on every accepted mutation.
    version: u64,
    /// Unix-ms timestamp of the last accepted mutation.
    last_updated: u64,
}

/// Serializable view of a [`CollaborationState`], sent to joining sessions.
///
/// Locks are flattened to a list sorted by component id so snapshots are
/// stable on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// The project this snapshot describes.
    pub project_id: String,
    /// Sessions attached at snapshot time.
    pub users: Vec<UserPresence>,
    /// Live locks at snapshot time.
    pub locks: Vec<ProjectLock>,
    /// Document version at snapshot time.
    pub version: u64,
    /// Unix-ms timestamp of the last accepted mutation.
    pub last_updated: u64,
}

impl CollaborationState {
    /// Create the state for a project's first join.
    #[must_use]
    pub fn new(project_id: impl Into<String>, now_ms: u64) -> Self {
        Self {
            project_id: project_id.into(),
            users: Vec::new(),
            locks: HashMap::new(),
            version: 1,
            last_updated: now_ms,
        }
    }

    /// The project this state belongs to.
    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Currently attached sessions.
    #[must_use]
    pub fn users(&self) -> &[UserPresence] {
        &self.users
    }

    /// Current document version.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of live (unexpired) locks at `now_ms`.
    #[must_use]
    pub fn live_lock_count(&self, now_ms: u64) -> usize {
        self.locks.values().filter(|l| !l.is_expired(now_ms)).count()
    }

    /// Whether no sessions remain attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Attach a session's presence.
    ///
    /// A presence with the same `session_id` is replaced (reconnect with a
    /// reused id); other sessions of the same user stay untouched, since one
    /// user may edit from several tabs at once.
    ///
    /// # Errors
    ///
    /// Returns [`CollabError::ProjectFull`] when the project already has
    /// `max_users` sessions attached.
    pub fn add_user(&mut self, user: UserPresence, max_users: usize) -> Result<(), CollabError> {
        self.users.retain(|u| u.session_id != user.session_id);
        if self.users.len() >= max_users {
            return Err(CollabError::ProjectFull(self.project_id.clone()));
        }
        self.users.push(user);
        Ok(())
    }

    /// Detach the presence matching `(user_id, session_id)` exactly.
    ///
    /// Returns the removed presence, or `None` if the session was already
    /// gone (teardown is idempotent).
    pub fn remove_user(&mut self, user_id: &str, session_id: &str) -> Option<UserPresence> {
        let idx = self
            .users
            .iter()
            .position(|u| u.user_id == user_id && u.session_id == session_id)?;
        Some(self.users.remove(idx))
    }

    /// Refresh liveness for a session. Returns false if the session is not
    /// attached.
    pub fn touch_session(&mut self, session_id: &str, now_ms: u64) -> bool {
        match self.session_mut(session_id) {
            Some(user) => {
                user.touch(now_ms);
                true
            }
            None => false,
        }
    }

    /// Update a session's reported cursor position.
    pub fn update_cursor(&mut self, session_id: &str, cursor: CursorPosition) {
        if let Some(user) = self.session_mut(session_id) {
            user.cursor = Some(cursor);
        }
    }

    /// Update a session's selected component (`None` clears it).
    pub fn update_selection(&mut self, session_id: &str, component_id: Option<String>) {
        if let Some(user) = self.session_mut(session_id) {
            user.selected_component = component_id;
        }
    }

    fn session_mut(&mut self, session_id: &str) -> Option<&mut UserPresence> {
        self.users.iter_mut().find(|u| u.session_id == session_id)
    }

    /// Look up the live lock on a component, deleting it if it has expired.
    pub fn live_lock(&mut self, component_id: &str, now_ms: u64) -> Option<&ProjectLock> {
        if self
            .locks
            .get(component_id)
            .is_some_and(|l| l.is_expired(now_ms))
        {
            self.locks.remove(component_id);
        }
        self.locks.get(component_id)
    }

    /// Acquire or refresh the lock on a component.
    ///
    /// A live lock held by a different user blocks acquisition; the same
    /// user (from any of their sessions) refreshes the claim, re-stamping
    /// its timestamps and rebinding it to the acquiring session.
    ///
    /// # Errors
    ///
    /// Returns [`CollabError::LockHeld`] carrying the conflicting lock.
    pub fn acquire_lock(
        &mut self,
        component_id: &str,
        user_id: &str,
        session_id: &str,
        lock_type: LockType,
        now_ms: u64,
        duration_ms: u64,
    ) -> Result<ProjectLock, CollabError> {
        if let Some(existing) = self.live_lock(component_id, now_ms) {
            if existing.user_id != user_id {
                return Err(CollabError::LockHeld(Box::new(existing.clone())));
            }
        }
        let lock = ProjectLock::new(
            component_id,
            user_id,
            session_id,
            lock_type,
            now_ms,
            duration_ms,
        );
        self.locks.insert(component_id.to_string(), lock.clone());
        Ok(lock)
    }

    /// Remove the lock on a component. A missing lock is a no-op.
    pub fn release_lock(&mut self, component_id: &str) -> Option<ProjectLock> {
        self.locks.remove(component_id)
    }

    /// Check whether `user_id` may mutate `component_id` at `now_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`CollabError::LockHeld`] when a live lock belongs to a
    /// different user.
    pub fn guard_mutation(
        &mut self,
        component_id: &str,
        user_id: &str,
        now_ms: u64,
    ) -> Result<(), CollabError> {
        match self.live_lock(component_id, now_ms) {
            Some(lock) if lock.user_id != user_id => {
                Err(CollabError::LockHeld(Box::new(lock.clone())))
            }
            _ => Ok(()),
        }
    }

    /// Record an accepted mutation: advance and return the version clock.
    pub fn record_change(&mut self, now_ms: u64) -> u64 {
        self.version += 1;
        self.last_updated = now_ms;
        self.version
    }

    /// Drop every lock held by `(user_id, session_id)`. Returns how many.
    pub fn remove_session_locks(&mut self, user_id: &str, session_id: &str) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, l| !l.held_by(user_id, session_id));
        before - self.locks.len()
    }

    /// Delete every expired lock. Returns how many were dropped.
    pub fn prune_expired_locks(&mut self, now_ms: u64) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, l| !l.is_expired(now_ms));
        before - self.locks.len()
    }

    /// Sessions silent for longer than `threshold_ms` at `now_ms`.
    #[must_use]
    pub fn stale_sessions(&self, now_ms: u64, threshold_ms: u64) -> Vec<(String, String)> {
        self.users
            .iter()
            .filter(|u| u.is_stale(now_ms, threshold_ms))
            .map(|u| (u.user_id.clone(), u.session_id.clone()))
            .collect()
    }

    /// Produce the serializable view sent to joining sessions.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let mut locks: Vec<ProjectLock> = self.locks.values().cloned().collect();
        locks.sort_by(|a, b| a.component_id.cmp(&b.component_id));
        StateSnapshot {
            project_id: self.project_id.clone(),
            users: self.users.clone(),
            locks,
            version: self.version,
            last_updated: self.last_updated,
        }
    }
}
