//! Periodic liveness sweeper.
//!
//! Runs on the configured interval and does two jobs: evicts sessions that
//! have been silent past the inactivity threshold (full teardown, exactly
//! as if they had disconnected) and prunes locks whose deadline passed, so
//! an expired lock disappears even when nobody touches its component again.

use collab_core::current_timestamp;
use tokio::task::JoinHandle;

use crate::metrics::{record_locks_expired, record_sessions_swept, set_active_projects};
use crate::session::disconnect;
use crate::AppState;

/// Spawn the background sweep loop.
///
/// The first tick fires immediately; aborting the handle stops the loop.
pub fn spawn_sweeper(state: AppState) -> JoinHandle<()> {
    let interval = state.config().sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            sweep(&state, current_timestamp());
        }
    })
}

/// One sweep pass at the given instant.
///
/// Takes the clock as a parameter so tests can drive it deterministically.
pub fn sweep(state: &AppState, now_ms: u64) {
    let stale = state.store.stale_sessions(now_ms);
    let swept = stale.len();
    for (project_id, user_id, session_id) in stale {
        tracing::info!(
            "Sweeping inactive session {} (user {} in project {})",
            session_id,
            user_id,
            project_id
        );
        disconnect(state, &project_id, &user_id, &session_id);
    }
    if swept > 0 {
        record_sessions_swept(swept);
    }

    let expired = state.store.prune_expired_locks(now_ms);
    if expired > 0 {
        tracing::debug!("Pruned {} expired lock(s)", expired);
        record_locks_expired(expired);
    }

    set_active_projects(state.store.stats().active_projects);
}

#[cfg(test)]
mod tests {
    use super::*;
    use collab_core::{current_timestamp, LockType, ServerEvent};

    #[tokio::test]
    async fn sweep_evicts_silent_sessions_and_notifies_survivors() {
        let state = AppState::default();
        let now = current_timestamp();
        state.store.join("p1", "alice", "s-a", "Alice", now).unwrap();
        state.store.join("p1", "bob", "s-b", "Bob", now).unwrap();
        let mut rx_a = state.registry.register("s-a", "alice", "p1");
        let mut rx_b = state.registry.register("s-b", "bob", "p1");

        // Bob stays active; Alice goes silent past the threshold.
        let later = now + state.config().inactive_threshold_ms() + 1;
        state.store.touch("p1", "s-b", later);

        sweep(&state, later);

        assert!(!state.registry.contains("s-a"));
        assert!(state.registry.contains("s-b"));
        assert!(rx_a.recv().await.is_none());
        match rx_b.try_recv() {
            Ok(ServerEvent::UserLeave { user_id, .. }) => assert_eq!(user_id, "alice"),
            other => panic!("expected user_leave for alice, got {other:?}"),
        }

        let snapshot = state.store.snapshot("p1").expect("project survives");
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].user_id, "bob");
    }

    #[tokio::test]
    async fn sweep_prunes_expired_locks_without_touching_live_ones() {
        let state = AppState::default();
        state.store.join("p1", "alice", "s-a", "Alice", 0).unwrap();
        state
            .store
            .acquire_lock("p1", "old", "alice", "s-a", LockType::Edit, 0)
            .unwrap();

        // Keep the session alive but let the lock expire.
        let later = state.config().lock_duration_ms() + 1;
        state.store.touch("p1", "s-a", later);
        state
            .store
            .acquire_lock("p1", "fresh", "alice", "s-a", LockType::Edit, later)
            .unwrap();

        sweep(&state, later);

        let snapshot = state.store.snapshot("p1").expect("project survives");
        assert_eq!(snapshot.locks.len(), 1);
        assert_eq!(snapshot.locks[0].component_id, "fresh");
    }

    #[tokio::test]
    async fn sweeping_the_last_session_discards_the_project() {
        let state = AppState::default();
        let now = current_timestamp();
        state.store.join("p1", "alice", "s-a", "Alice", now).unwrap();
        let _rx = state.registry.register("s-a", "alice", "p1");

        sweep(&state, now + state.config().inactive_threshold_ms() + 1);

        assert!(state.store.snapshot("p1").is_none());
        assert!(state.registry.is_empty());
    }

    #[tokio::test]
    async fn sweep_is_quiet_when_everyone_is_live() {
        let state = AppState::default();
        let now = current_timestamp();
        state.store.join("p1", "alice", "s-a", "Alice", now).unwrap();
        let _rx = state.registry.register("s-a", "alice", "p1");

        sweep(&state, now + 1_000);

        assert!(state.registry.contains("s-a"));
        assert_eq!(state.store.snapshot("p1").unwrap().users.len(), 1);
    }
}
