//! Shared collaboration state store.
//!
//! Provides a thread-safe [`CollabStore`] shared by every connection task,
//! the sweeper, and the HTTP stats routes. All mutation of a project's
//! [`CollaborationState`](crate::CollaborationState) goes through one write
//! acquisition, so presence changes, lock decisions, and version increments
//! for a project are serialized and the version clock is linearizable.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use rand::Rng;
use serde::Serialize;

use crate::config::{CollabConfig, USER_COLORS};
use crate::error::CollabError;
use crate::lock::{LockType, ProjectLock};
use crate::presence::{CursorPosition, UserPresence};
use crate::state::{CollaborationState, StateSnapshot};

/// What a session's departure changed, for the caller to broadcast.
#[derive(Debug, Clone)]
pub struct LeaveOutcome {
    /// The presence that was detached.
    pub presence: UserPresence,
    /// How many locks the departing session held.
    pub released_locks: usize,
    /// Whether the whole project state was garbage-collected.
    pub project_removed: bool,
}

/// Operational counters exposed for monitoring.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollabStats {
    /// Projects with at least one attached session.
    pub active_projects: usize,
    /// Outstanding locks across all projects.
    pub total_locks: usize,
}

/// Thread-safe store of per-project collaboration state.
///
/// # Example
///
/// ```
/// use collab_core::CollabStore;
///
/// let store = CollabStore::new();
/// let (user, snapshot) = store
///     .join("p1", "alice", "s-1", "Alice", 1_000)
///     .unwrap();
/// assert_eq!(snapshot.version, 1);
/// assert_eq!(user.color, collab_core::USER_COLORS[0]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CollabStore {
    projects: Arc<RwLock<HashMap<String, CollaborationState>>>,
    config: CollabConfig,
}

impl CollabStore {
    /// Create a store with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CollabConfig::default())
    }

    /// Create a store with explicit configuration.
    #[must_use]
    pub fn with_config(config: CollabConfig) -> Self {
        Self {
            projects: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// The configuration this store was built with.
    #[must_use]
    pub fn config(&self) -> &CollabConfig {
        &self.config
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CollaborationState>> {
        self.projects
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CollaborationState>> {
        self.projects
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Attach a new session to a project, creating the project state lazily.
    ///
    /// Assigns the first palette color not in use within the project (random
    /// pick once all are taken) and returns the constructed presence along
    /// with a snapshot that already includes it.
    ///
    /// # Errors
    ///
    /// Returns [`CollabError::ProjectFull`] when the project is at capacity;
    /// no state is created or modified in that case.
    pub fn join(
        &self,
        project_id: &str,
        user_id: &str,
        session_id: &str,
        name: &str,
        now_ms: u64,
    ) -> Result<(UserPresence, StateSnapshot), CollabError> {
        let mut projects = self.write();
        let created = !projects.contains_key(project_id);
        if created {
            tracing::debug!("Creating collaboration state for project {}", project_id);
        }
        let state = projects
            .entry(project_id.to_string())
            .or_insert_with(|| CollaborationState::new(project_id, now_ms));

        let color = assign_color(state.users());
        let user = UserPresence::new(user_id, session_id, name, color, now_ms);

        if let Err(err) = state.add_user(user.clone(), self.config.max_users_per_project) {
            if created {
                projects.remove(project_id);
            }
            return Err(err);
        }
        let snapshot = projects
            .get(project_id)
            .map(CollaborationState::snapshot)
            .ok_or_else(|| CollabError::ProjectNotFound(project_id.to_string()))?;
        Ok((user, snapshot))
    }

    /// Detach a session: drop its presence and every lock it held, and
    /// garbage-collect the project state when the presence list empties.
    ///
    /// Returns `None` when the session was not attached (idempotent).
    pub fn leave(&self, project_id: &str, user_id: &str, session_id: &str) -> Option<LeaveOutcome> {
        let mut projects = self.write();
        let state = projects.get_mut(project_id)?;
        let presence = state.remove_user(user_id, session_id)?;
        let released_locks = state.remove_session_locks(user_id, session_id);
        let project_removed = state.is_empty();
        if project_removed {
            tracing::debug!("Discarding empty collaboration state for project {}", project_id);
            projects.remove(project_id);
        }
        Some(LeaveOutcome {
            presence,
            released_locks,
            project_removed,
        })
    }

    /// Refresh liveness for a session before dispatching its event.
    pub fn touch(&self, project_id: &str, session_id: &str, now_ms: u64) {
        if let Some(state) = self.write().get_mut(project_id) {
            state.touch_session(session_id, now_ms);
        }
    }

    /// Record a session's cursor position.
    pub fn update_cursor(&self, project_id: &str, session_id: &str, cursor: CursorPosition) {
        if let Some(state) = self.write().get_mut(project_id) {
            state.update_cursor(session_id, cursor);
        }
    }

    /// Record a session's component selection (`None` clears it).
    pub fn update_selection(
        &self,
        project_id: &str,
        session_id: &str,
        component_id: Option<String>,
    ) {
        if let Some(state) = self.write().get_mut(project_id) {
            state.update_selection(session_id, component_id);
        }
    }

    /// Acquire or refresh a component lock for `(user_id, session_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`CollabError::LockHeld`] when another user holds a live lock
    /// on the component, [`CollabError::ProjectNotFound`] when the project
    /// has no state.
    pub fn acquire_lock(
        &self,
        project_id: &str,
        component_id: &str,
        user_id: &str,
        session_id: &str,
        lock_type: LockType,
        now_ms: u64,
    ) -> Result<ProjectLock, CollabError> {
        let mut projects = self.write();
        let state = projects
            .get_mut(project_id)
            .ok_or_else(|| CollabError::ProjectNotFound(project_id.to_string()))?;
        state.acquire_lock(
            component_id,
            user_id,
            session_id,
            lock_type,
            now_ms,
            self.config.lock_duration_ms(),
        )
    }

    /// Remove a component lock. Missing project or lock is a no-op.
    pub fn release_lock(&self, project_id: &str, component_id: &str) -> Option<ProjectLock> {
        self.write().get_mut(project_id)?.release_lock(component_id)
    }

    /// Apply a document-mutating event: run the lock guard and, if it
    /// passes, advance the version clock. Guard and increment happen under
    /// one write acquisition so a rejected mutation can never bump the
    /// version.
    ///
    /// # Errors
    ///
    /// Returns [`CollabError::LockHeld`] when another user holds a live lock
    /// on the component, [`CollabError::ProjectNotFound`] when the project
    /// has no state.
    pub fn apply_change(
        &self,
        project_id: &str,
        component_id: &str,
        user_id: &str,
        now_ms: u64,
    ) -> Result<u64, CollabError> {
        let mut projects = self.write();
        let state = projects
            .get_mut(project_id)
            .ok_or_else(|| CollabError::ProjectNotFound(project_id.to_string()))?;
        state.guard_mutation(component_id, user_id, now_ms)?;
        Ok(state.record_change(now_ms))
    }

    /// Snapshot a project's state, if it exists.
    #[must_use]
    pub fn snapshot(&self, project_id: &str) -> Option<StateSnapshot> {
        self.read().get(project_id).map(CollaborationState::snapshot)
    }

    /// Sessions across all projects silent past the configured threshold.
    #[must_use]
    pub fn stale_sessions(&self, now_ms: u64) -> Vec<(String, String, String)> {
        let threshold = self.config.inactive_threshold_ms();
        self.read()
            .iter()
            .flat_map(|(project_id, state)| {
                state
                    .stale_sessions(now_ms, threshold)
                    .into_iter()
                    .map(|(user_id, session_id)| (project_id.clone(), user_id, session_id))
            })
            .collect()
    }

    /// Delete expired locks in every project. Returns how many were dropped.
    pub fn prune_expired_locks(&self, now_ms: u64) -> usize {
        self.write()
            .values_mut()
            .map(|state| state.prune_expired_locks(now_ms))
            .sum()
    }

    /// Counters for the stats endpoint.
    #[must_use]
    pub fn stats(&self) -> CollabStats {
        let projects = self.read();
        CollabStats {
            active_projects: projects.len(),
            total_locks: projects
                .values()
                .map(|state| state.snapshot().locks.len())
                .sum(),
        }
    }
}

/// First palette color unused in the project, random pick once exhausted.
fn assign_color(users: &[UserPresence]) -> &'static str {
    let used: HashSet<&str> = users.iter().map(|u| u.color.as_str()).collect();
    USER_COLORS
        .iter()
        .find(|color| !used.contains(*color))
        .copied()
        .unwrap_or_else(|| USER_COLORS[rand::rng().random_range(0..USER_COLORS.len())])
}
