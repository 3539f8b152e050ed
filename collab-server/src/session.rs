//! Connection lifecycle and event routing.
//!
//! A connection is scoped to one `(project, user)` pair carried on the
//! handshake query string. On accept it gets a fresh session id, a palette
//! color, and a presence entry; a full state snapshot is sent back before
//! the rest of the project hears a `user_join`. Inbound events are routed
//! by [`ClientSession::handle_event`], which is transport-independent so
//! the dispatch table can be tested without sockets.

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use collab_core::{
    current_timestamp, ClientEvent, CollabError, ComponentChange, LockType, ServerEvent,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use crate::metrics::{
    dec_ws_connections, inc_ws_connections, record_event, record_lock_conflict,
    record_validation_failure,
};
use crate::validation::{
    validate_component_id, validate_message_size, validate_project_id, validate_user_id,
    validate_user_name,
};
use crate::AppState;

/// Close code sent when a join is refused by policy (project at capacity).
const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Display name used when the client does not supply one.
const DEFAULT_USER_NAME: &str = "Anonymous";

/// Error message attached to lock-conflict replies.
const LOCK_CONFLICT_MESSAGE: &str = "Component is locked by another user";

/// Identity parameters required on the handshake query string.
///
/// Requests missing `projectId` or `userId` fail extraction and are
/// refused with 400 before the upgrade.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinParams {
    /// Project the connection attaches to.
    pub project_id: String,
    /// Stable user identity from the hosting application.
    pub user_id: String,
    /// Optional display name.
    #[serde(default)]
    pub user_name: Option<String>,
}

impl JoinParams {
    /// Validate the identity parameters.
    ///
    /// # Errors
    ///
    /// Returns the first failing [`ValidationError`](crate::validation::ValidationError).
    pub fn validate(&self) -> Result<(), crate::validation::ValidationError> {
        validate_project_id(&self.project_id)?;
        validate_user_id(&self.user_id)?;
        if let Some(name) = &self.user_name {
            validate_user_name(name)?;
        }
        Ok(())
    }
}

/// WebSocket handler for `/ws/collaboration`.
#[tracing::instrument(name = "collaboration_connect", skip(ws, state), fields(project_id = %params.project_id, user_id = %params.user_id))]
pub async fn collaboration_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(state): State<AppState>,
) -> Response {
    if let Err(e) = params.validate() {
        tracing::warn!("Handshake rejected: {}", e);
        record_validation_failure("handshake");
        return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
    }
    ws.on_upgrade(move |socket| handle_collaboration_socket(socket, state, params))
        .into_response()
}

/// Router for one session's inbound events.
///
/// Holds no transport state: the socket task parses frames and calls
/// [`handle_event`](Self::handle_event); a returned event goes back to this
/// session only (pongs and conflict notifications), while broadcasts go out
/// through the registry.
#[derive(Clone)]
pub struct ClientSession {
    state: AppState,
    project_id: String,
    user_id: String,
    session_id: String,
}

impl ClientSession {
    /// Create the router for a registered session.
    #[must_use]
    pub fn new(
        state: AppState,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            state,
            project_id: project_id.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }

    /// This session's id.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Route one inbound event.
    ///
    /// Refreshes the sender's liveness first, then dispatches. Returns the
    /// event to send back to the sender alone, if any; everything else is
    /// fanned out through the registry (transient cursor/selection signals
    /// exclude the sender, document mutations echo to everyone so the
    /// sender learns its authoritative version).
    pub fn handle_event(&self, event: ClientEvent) -> Option<ServerEvent> {
        let now = current_timestamp();
        self.state
            .store
            .touch(&self.project_id, &self.session_id, now);
        record_event(event.kind());

        match event {
            ClientEvent::CursorMove { cursor } => {
                self.state
                    .store
                    .update_cursor(&self.project_id, &self.session_id, cursor);
                self.broadcast_excluding_self(ServerEvent::CursorMove {
                    project_id: self.project_id.clone(),
                    user_id: self.user_id.clone(),
                    session_id: self.session_id.clone(),
                    cursor,
                    timestamp: now,
                });
                None
            }
            ClientEvent::ComponentSelect { component_id } => {
                if let Some(id) = &component_id {
                    if !self.component_id_ok(id) {
                        return None;
                    }
                }
                self.state.store.update_selection(
                    &self.project_id,
                    &self.session_id,
                    component_id.clone(),
                );
                self.broadcast_excluding_self(ServerEvent::ComponentSelect {
                    project_id: self.project_id.clone(),
                    user_id: self.user_id.clone(),
                    session_id: self.session_id.clone(),
                    component_id,
                    timestamp: now,
                });
                None
            }
            ClientEvent::ComponentAdd { component_id, data } => {
                self.handle_change(ServerEvent::ComponentAdd, component_id, data, now)
            }
            ClientEvent::ComponentUpdate { component_id, data } => {
                self.handle_change(ServerEvent::ComponentUpdate, component_id, data, now)
            }
            ClientEvent::ComponentDelete { component_id } => self.handle_change(
                ServerEvent::ComponentDelete,
                component_id,
                serde_json::Value::Null,
                now,
            ),
            ClientEvent::StyleChange { component_id, data } => {
                self.handle_change(ServerEvent::StyleChange, component_id, data, now)
            }
            ClientEvent::ContentChange { component_id, data } => {
                self.handle_change(ServerEvent::ContentChange, component_id, data, now)
            }
            ClientEvent::ProjectLock {
                component_id,
                lock_type,
            } => self.handle_lock(&component_id, lock_type, now),
            ClientEvent::ProjectUnlock { component_id } => {
                if !self.component_id_ok(&component_id) {
                    return None;
                }
                // Unlocking a component nobody holds is a no-op: nothing to
                // tell the project about.
                if self
                    .state
                    .store
                    .release_lock(&self.project_id, &component_id)
                    .is_some()
                {
                    self.broadcast_to_all(ServerEvent::ProjectUnlock {
                        project_id: self.project_id.clone(),
                        user_id: self.user_id.clone(),
                        session_id: self.session_id.clone(),
                        component_id,
                        timestamp: now,
                    });
                }
                None
            }
            ClientEvent::Ping => Some(ServerEvent::Pong { timestamp: now }),
        }
    }

    /// Lock-checked mutation path shared by the five change event kinds.
    ///
    /// `wrap` is the server-event constructor for the matching wire tag.
    fn handle_change(
        &self,
        wrap: fn(ComponentChange) -> ServerEvent,
        component_id: String,
        data: serde_json::Value,
        now: u64,
    ) -> Option<ServerEvent> {
        if !self.component_id_ok(&component_id) {
            return None;
        }
        match self
            .state
            .store
            .apply_change(&self.project_id, &component_id, &self.user_id, now)
        {
            Ok(version) => {
                self.broadcast_to_all(wrap(ComponentChange {
                    project_id: self.project_id.clone(),
                    user_id: self.user_id.clone(),
                    session_id: self.session_id.clone(),
                    component_id,
                    data,
                    version,
                    timestamp: now,
                }));
                None
            }
            Err(CollabError::LockHeld(lock)) => Some(self.lock_conflict(*lock, now)),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "Dropping change for {}: {}",
                    component_id,
                    e
                );
                None
            }
        }
    }

    fn handle_lock(&self, component_id: &str, lock_type: LockType, now: u64) -> Option<ServerEvent> {
        if !self.component_id_ok(component_id) {
            return None;
        }
        match self.state.store.acquire_lock(
            &self.project_id,
            component_id,
            &self.user_id,
            &self.session_id,
            lock_type,
            now,
        ) {
            Ok(lock) => {
                self.broadcast_to_all(ServerEvent::ProjectLock {
                    project_id: self.project_id.clone(),
                    user_id: self.user_id.clone(),
                    session_id: self.session_id.clone(),
                    lock: Some(lock),
                    error: None,
                    timestamp: now,
                });
                None
            }
            Err(CollabError::LockHeld(lock)) => Some(self.lock_conflict(*lock, now)),
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "Dropping lock request for {}: {}",
                    component_id,
                    e
                );
                None
            }
        }
    }

    /// Conflict reply for the requester only; identifies the current holder
    /// and never advances the document version.
    fn lock_conflict(&self, lock: collab_core::ProjectLock, now: u64) -> ServerEvent {
        record_lock_conflict();
        tracing::debug!(
            session_id = %self.session_id,
            "Lock conflict on {}: held by {}",
            lock.component_id,
            lock.user_id
        );
        ServerEvent::ProjectLock {
            project_id: self.project_id.clone(),
            user_id: lock.user_id.clone(),
            session_id: lock.session_id.clone(),
            lock: Some(lock),
            error: Some(LOCK_CONFLICT_MESSAGE.to_string()),
            timestamp: now,
        }
    }

    fn component_id_ok(&self, id: &str) -> bool {
        match validate_component_id(id) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, "Invalid componentId: {}", e);
                record_validation_failure("component_id");
                false
            }
        }
    }

    fn broadcast_to_all(&self, event: ServerEvent) {
        self.state.registry.broadcast(&self.project_id, &event, None);
    }

    fn broadcast_excluding_self(&self, event: ServerEvent) {
        self.state
            .registry
            .broadcast(&self.project_id, &event, Some(&self.session_id));
    }
}

/// Drive one accepted WebSocket connection to completion.
pub async fn handle_collaboration_socket(socket: WebSocket, state: AppState, params: JoinParams) {
    let session_id = Uuid::new_v4().to_string();
    let user_name = params
        .user_name
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_NAME.to_string());
    let now = current_timestamp();

    let (mut sender, mut receiver) = socket.split();

    // Register presence; a full project is refused before any state exists.
    let (user, snapshot) = match state.store.join(
        &params.project_id,
        &params.user_id,
        &session_id,
        &user_name,
        now,
    ) {
        Ok(joined) => joined,
        Err(e) => {
            tracing::warn!("Join refused for {}: {}", params.user_id, e);
            let _ = sender
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_POLICY_VIOLATION,
                    reason: e.to_string().into(),
                })))
                .await;
            return;
        }
    };

    let mut outbound = state
        .registry
        .register(&session_id, &params.user_id, &params.project_id);
    inc_ws_connections();

    let session = ClientSession::new(
        state.clone(),
        &params.project_id,
        &params.user_id,
        &session_id,
    );

    // The joiner gets the full snapshot before anyone else hears about it.
    let welcome = ServerEvent::UserJoin {
        project_id: params.project_id.clone(),
        user: user.clone(),
        state: Some(snapshot),
        timestamp: now,
    };
    match serde_json::to_string(&welcome) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                disconnect(&state, &params.project_id, &params.user_id, &session_id);
                return;
            }
        }
        Err(e) => {
            tracing::error!(session_id = %session_id, "Failed to serialize join snapshot: {}", e);
            disconnect(&state, &params.project_id, &params.user_id, &session_id);
            return;
        }
    }

    state.registry.broadcast(
        &params.project_id,
        &ServerEvent::UserJoin {
            project_id: params.project_id.clone(),
            user,
            state: None,
            timestamp: now,
        },
        Some(&session_id),
    );

    tracing::info!(
        "User {} joined project {} (session: {})",
        params.user_id,
        params.project_id,
        session_id
    );

    loop {
        tokio::select! {
            // Inbound frames from this client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = validate_message_size(text.len()) {
                            tracing::warn!(session_id = %session_id, "Dropping frame: {}", e);
                            record_validation_failure("message_size");
                            continue;
                        }
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => {
                                if let Some(reply) = session.handle_event(event) {
                                    if let Ok(json) = serde_json::to_string(&reply) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                // Malformed payloads are dropped; the
                                // connection stays open.
                                tracing::warn!(session_id = %session_id, "Invalid collaboration event: {}", e);
                                record_validation_failure("event");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(session_id = %session_id, "Client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!(session_id = %session_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }

            // Events fanned out to this session
            event = outbound.recv() => {
                match event {
                    Some(event) => {
                        if let Ok(json) = serde_json::to_string(&event) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => {
                        // Registry entry removed out from under us: the
                        // sweeper evicted this session.
                        tracing::debug!(session_id = %session_id, "Outbound channel closed");
                        break;
                    }
                }
            }
        }
    }

    disconnect(&state, &params.project_id, &params.user_id, &session_id);
    tracing::info!(
        "User {} left project {} (session: {})",
        params.user_id,
        params.project_id,
        session_id
    );
}

/// Tear down one session: registry entry, presence, and held locks go
/// together, then the remaining project hears a single `user_leave`.
///
/// Used by graceful close, transport error, and sweeper eviction alike, and
/// safe to call twice: the second call finds nothing to remove.
pub fn disconnect(state: &AppState, project_id: &str, user_id: &str, session_id: &str) {
    if state.registry.remove(session_id) {
        dec_ws_connections();
    }
    let Some(outcome) = state.store.leave(project_id, user_id, session_id) else {
        return;
    };
    state.registry.broadcast(
        project_id,
        &ServerEvent::UserLeave {
            project_id: project_id.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            timestamp: current_timestamp(),
        },
        None,
    );
    if outcome.released_locks > 0 {
        tracing::debug!(
            "Released {} lock(s) held by session {}",
            outcome.released_locks,
            session_id
        );
    }
    if outcome.project_removed {
        tracing::info!("Project {} has no sessions left; state discarded", project_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collab_core::CursorPosition;
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Attach a session the way the socket task does, minus the socket.
    fn join(
        state: &AppState,
        project: &str,
        user: &str,
        session: &str,
    ) -> (ClientSession, UnboundedReceiver<ServerEvent>) {
        let now = current_timestamp();
        let (presence, _snapshot) = state
            .store
            .join(project, user, session, user, now)
            .expect("join should succeed");
        let rx = state.registry.register(session, user, project);
        state.registry.broadcast(
            project,
            &ServerEvent::UserJoin {
                project_id: project.to_string(),
                user: presence,
                state: None,
                timestamp: now,
            },
            Some(session),
        );
        (ClientSession::new(state.clone(), project, user, session), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn cursor_moves_reach_everyone_but_the_sender() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (_bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        let reply = alice.handle_event(ClientEvent::CursorMove {
            cursor: CursorPosition { x: 5.0, y: 7.0 },
        });
        assert!(reply.is_none());
        assert!(drain(&mut rx_a).is_empty());

        let received = drain(&mut rx_b);
        assert_eq!(received.len(), 1);
        match &received[0] {
            ServerEvent::CursorMove { user_id, cursor, .. } => {
                assert_eq!(user_id, "alice");
                assert!((cursor.x - 5.0).abs() < f64::EPSILON);
            }
            other => panic!("expected cursor_move, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn selection_updates_presence_and_excludes_sender() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (_bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        alice.handle_event(ClientEvent::ComponentSelect {
            component_id: Some("hero".to_string()),
        });

        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(drain(&mut rx_b).len(), 1);

        let snapshot = state.store.snapshot("p1").expect("project exists");
        let presence = snapshot
            .users
            .iter()
            .find(|u| u.session_id == "s-a")
            .expect("alice present");
        assert_eq!(presence.selected_component.as_deref(), Some("hero"));
    }

    #[tokio::test]
    async fn mutations_echo_to_everyone_with_the_new_version() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (_bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        let reply = alice.handle_event(ClientEvent::ComponentUpdate {
            component_id: "btn1".to_string(),
            data: serde_json::json!({"text": "Buy"}),
        });
        assert!(reply.is_none());

        for rx in [&mut rx_a, &mut rx_b] {
            let received = drain(rx);
            assert_eq!(received.len(), 1);
            match &received[0] {
                ServerEvent::ComponentUpdate(change) => {
                    assert_eq!(change.component_id, "btn1");
                    assert_eq!(change.version, 2);
                }
                other => panic!("expected component_update, got {other:?}"),
            }
        }
    }

    /// The full two-user locking scenario: grant, conflict to the requester
    /// only, unlock, successful retry.
    #[tokio::test]
    async fn lock_conflict_is_reported_to_the_requester_only() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        let (_carol, mut rx_c) = join(&state, "p1", "carol", "s-c");
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        // Alice locks btn1; the grant is broadcast to everyone.
        let reply = alice.handle_event(ClientEvent::ProjectLock {
            component_id: "btn1".to_string(),
            lock_type: LockType::Edit,
        });
        assert!(reply.is_none());
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            let received = drain(rx);
            assert_eq!(received.len(), 1);
            match &received[0] {
                ServerEvent::ProjectLock { lock, error, .. } => {
                    assert!(error.is_none());
                    assert_eq!(lock.as_ref().unwrap().user_id, "alice");
                }
                other => panic!("expected project_lock, got {other:?}"),
            }
        }

        // Bob's update is rejected; only Bob hears about it.
        let reply = bob.handle_event(ClientEvent::ComponentUpdate {
            component_id: "btn1".to_string(),
            data: serde_json::json!({"text": "Hack"}),
        });
        match reply {
            Some(ServerEvent::ProjectLock { user_id, error, lock, .. }) => {
                assert_eq!(user_id, "alice");
                assert!(error.is_some());
                assert_eq!(lock.unwrap().user_id, "alice");
            }
            other => panic!("expected conflict reply, got {other:?}"),
        }
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
        assert!(drain(&mut rx_c).is_empty());
        assert_eq!(state.store.snapshot("p1").unwrap().version, 1);

        // Alice unlocks; Bob's retry lands and bumps the version for all.
        alice.handle_event(ClientEvent::ProjectUnlock {
            component_id: "btn1".to_string(),
        });
        drain(&mut rx_a);
        drain(&mut rx_b);
        drain(&mut rx_c);

        let reply = bob.handle_event(ClientEvent::ComponentUpdate {
            component_id: "btn1".to_string(),
            data: serde_json::json!({"text": "Buy"}),
        });
        assert!(reply.is_none());
        for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
            let received = drain(rx);
            assert_eq!(received.len(), 1);
            match &received[0] {
                ServerEvent::ComponentUpdate(change) => assert_eq!(change.version, 2),
                other => panic!("expected component_update, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn competing_lock_request_is_refused() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        alice.handle_event(ClientEvent::ProjectLock {
            component_id: "btn1".to_string(),
            lock_type: LockType::Edit,
        });
        drain(&mut rx_a);
        drain(&mut rx_b);

        let reply = bob.handle_event(ClientEvent::ProjectLock {
            component_id: "btn1".to_string(),
            lock_type: LockType::Edit,
        });
        match reply {
            Some(ServerEvent::ProjectLock { user_id, error, .. }) => {
                assert_eq!(user_id, "alice");
                assert!(error.is_some());
            }
            other => panic!("expected conflict reply, got {other:?}"),
        }
        // No grant was broadcast for the refused request.
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn unlocking_nothing_is_a_silent_noop() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (_bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        let reply = alice.handle_event(ClientEvent::ProjectUnlock {
            component_id: "never-locked".to_string(),
        });
        assert!(reply.is_none());
        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn ping_gets_a_pong_for_the_sender_alone() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (_bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        let reply = alice.handle_event(ClientEvent::Ping);
        assert!(matches!(reply, Some(ServerEvent::Pong { .. })));
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test]
    async fn disconnect_releases_locks_and_notifies_the_project() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        alice.handle_event(ClientEvent::ProjectLock {
            component_id: "btn1".to_string(),
            lock_type: LockType::Edit,
        });
        drain(&mut rx_b);

        disconnect(&state, "p1", "alice", "s-a");

        let received = drain(&mut rx_b);
        assert_eq!(received.len(), 1);
        match &received[0] {
            ServerEvent::UserLeave { user_id, session_id, .. } => {
                assert_eq!(user_id, "alice");
                assert_eq!(session_id, "s-a");
            }
            other => panic!("expected user_leave, got {other:?}"),
        }

        // Alice's lock went with her; Bob can claim the component now.
        let reply = bob.handle_event(ClientEvent::ProjectLock {
            component_id: "btn1".to_string(),
            lock_type: LockType::Edit,
        });
        assert!(reply.is_none());

        // Alice's channel is closed and a second teardown changes nothing.
        assert_eq!(rx_a.try_recv(), Err(TryRecvError::Disconnected));
        disconnect(&state, "p1", "alice", "s-a");
    }

    #[tokio::test]
    async fn disconnecting_one_session_keeps_the_users_other_tab() {
        let state = AppState::default();
        let (_tab1, _rx1) = join(&state, "p1", "alice", "s-1");
        let (_tab2, _rx2) = join(&state, "p1", "alice", "s-2");

        disconnect(&state, "p1", "alice", "s-1");

        let snapshot = state.store.snapshot("p1").expect("project survives");
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].session_id, "s-2");
    }

    #[tokio::test]
    async fn invalid_component_ids_are_dropped() {
        let state = AppState::default();
        let (alice, mut rx_a) = join(&state, "p1", "alice", "s-a");
        let (_bob, mut rx_b) = join(&state, "p1", "bob", "s-b");
        drain(&mut rx_a);
        drain(&mut rx_b);

        let reply = alice.handle_event(ClientEvent::ComponentUpdate {
            component_id: "../escape".to_string(),
            data: serde_json::Value::Null,
        });
        assert!(reply.is_none());
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(state.store.snapshot("p1").unwrap().version, 1);
    }
}
