//! Collaboration wire protocol.
//!
//! One JSON object per WebSocket text message, tagged on `"type"` with
//! snake_case tags and camelCase fields, matching what the editor clients
//! speak. Inbound and outbound directions are separate enums so each
//! variant carries only the fields it needs instead of an untyped `data`
//! grab-bag.
//!
//! ## Client -> Server
//!
//! - `{"type": "cursor_move", "cursor": {"x": 10, "y": 20}}`
//! - `{"type": "component_select", "componentId": "btn1"}`
//! - `{"type": "component_add", "componentId": "btn1", "data": {...}}`
//! - `{"type": "component_update", "componentId": "btn1", "data": {...}}`
//! - `{"type": "component_delete", "componentId": "btn1"}`
//! - `{"type": "style_change", "componentId": "btn1", "data": {...}}`
//! - `{"type": "content_change", "componentId": "btn1", "data": {...}}`
//! - `{"type": "project_lock", "componentId": "btn1", "lockType": "edit"}`
//! - `{"type": "project_unlock", "componentId": "btn1"}`
//! - `{"type": "ping"}`
//!
//! ## Server -> Client
//!
//! - `{"type": "user_join", "projectId": "...", "user": {...}, "state": {...}}`
//!   (`state` only on the copy sent to the joining session)
//! - `{"type": "user_leave", "projectId": "...", "userId": "...", "sessionId": "..."}`
//! - `cursor_move` / `component_select` relayed with the sender's identity
//! - `component_add` etc. echoed to everyone with the new `version`
//! - `{"type": "project_lock", ..., "lock": {...}}` on grant,
//!   `{"type": "project_lock", ..., "error": "...", "lock": {...}}` on conflict
//! - `{"type": "project_unlock", ..., "componentId": "..."}`
//! - `{"type": "pong", "timestamp": ...}`

use serde::{Deserialize, Serialize};

use crate::lock::{LockType, ProjectLock};
use crate::presence::{CursorPosition, UserPresence};
use crate::state::StateSnapshot;

/// Client-to-server collaboration messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Cursor moved; relayed to the other sessions.
    CursorMove {
        /// New cursor position.
        cursor: CursorPosition,
    },
    /// Selection changed; `None` clears the selection.
    ComponentSelect {
        /// Selected component, if any.
        #[serde(default)]
        component_id: Option<String>,
    },
    /// A component was added to the document.
    ComponentAdd {
        /// Target component.
        component_id: String,
        /// Opaque component payload forwarded to the other clients.
        #[serde(default)]
        data: serde_json::Value,
    },
    /// A component's definition changed.
    ComponentUpdate {
        /// Target component.
        component_id: String,
        /// Opaque change payload forwarded to the other clients.
        #[serde(default)]
        data: serde_json::Value,
    },
    /// A component was deleted.
    ComponentDelete {
        /// Target component.
        component_id: String,
    },
    /// A component's style properties changed.
    StyleChange {
        /// Target component.
        component_id: String,
        /// Opaque style payload forwarded to the other clients.
        #[serde(default)]
        data: serde_json::Value,
    },
    /// A component's text content changed.
    ContentChange {
        /// Target component.
        component_id: String,
        /// Opaque content payload forwarded to the other clients.
        #[serde(default)]
        data: serde_json::Value,
    },
    /// Request an exclusive claim on a component.
    ProjectLock {
        /// Target component.
        component_id: String,
        /// Claim strength; defaults to `edit`.
        #[serde(default)]
        lock_type: LockType,
    },
    /// Release the claim on a component.
    ProjectUnlock {
        /// Target component.
        component_id: String,
    },
    /// Keepalive; refreshes liveness like any other event.
    Ping,
}

impl ClientEvent {
    /// The wire tag, for logging and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CursorMove { .. } => "cursor_move",
            Self::ComponentSelect { .. } => "component_select",
            Self::ComponentAdd { .. } => "component_add",
            Self::ComponentUpdate { .. } => "component_update",
            Self::ComponentDelete { .. } => "component_delete",
            Self::StyleChange { .. } => "style_change",
            Self::ContentChange { .. } => "content_change",
            Self::ProjectLock { .. } => "project_lock",
            Self::ProjectUnlock { .. } => "project_unlock",
            Self::Ping => "ping",
        }
    }
}

/// An accepted document mutation, echoed to every session in the project.
///
/// Carries the server-assigned version so the sender can reconcile its
/// optimistic local state against the authoritative order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentChange {
    /// Project the mutation belongs to.
    pub project_id: String,
    /// User who made the change.
    pub user_id: String,
    /// Session the change arrived on.
    pub session_id: String,
    /// Target component.
    pub component_id: String,
    /// Opaque payload forwarded unmodified.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
    /// Document version assigned to this mutation.
    pub version: u64,
    /// Unix-ms timestamp the server accepted the mutation at.
    pub timestamp: u64,
}

/// Server-to-client collaboration messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A session joined the project.
    UserJoin {
        /// Project joined.
        project_id: String,
        /// The new presence.
        user: UserPresence,
        /// Full state snapshot; present only on the copy sent to the
        /// joining session itself.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<StateSnapshot>,
        /// Event timestamp.
        timestamp: u64,
    },
    /// A session left the project (disconnect or sweeper eviction).
    UserLeave {
        /// Project left.
        project_id: String,
        /// Departing user.
        user_id: String,
        /// Departing session.
        session_id: String,
        /// Event timestamp.
        timestamp: u64,
    },
    /// Another session's cursor moved.
    CursorMove {
        /// Project scope.
        project_id: String,
        /// Originating user.
        user_id: String,
        /// Originating session.
        session_id: String,
        /// New cursor position.
        cursor: CursorPosition,
        /// Event timestamp.
        timestamp: u64,
    },
    /// Another session's selection changed.
    ComponentSelect {
        /// Project scope.
        project_id: String,
        /// Originating user.
        user_id: String,
        /// Originating session.
        session_id: String,
        /// Selected component, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_id: Option<String>,
        /// Event timestamp.
        timestamp: u64,
    },
    /// A component was added.
    ComponentAdd(ComponentChange),
    /// A component was updated.
    ComponentUpdate(ComponentChange),
    /// A component was deleted.
    ComponentDelete(ComponentChange),
    /// A component's style changed.
    StyleChange(ComponentChange),
    /// A component's content changed.
    ContentChange(ComponentChange),
    /// Lock granted (broadcast) or lock conflict (requester only).
    ///
    /// On conflict, `error` is set, `lock` is the conflicting claim, and
    /// `user_id`/`session_id` identify the current holder.
    ProjectLock {
        /// Project scope.
        project_id: String,
        /// Lock holder.
        user_id: String,
        /// Holder's session.
        session_id: String,
        /// The granted or conflicting lock.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lock: Option<ProjectLock>,
        /// Set when a lock or mutation request was rejected.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        /// Event timestamp.
        timestamp: u64,
    },
    /// A lock was released.
    ProjectUnlock {
        /// Project scope.
        project_id: String,
        /// User who released the lock.
        user_id: String,
        /// Session that released the lock.
        session_id: String,
        /// The component the lock covered.
        component_id: String,
        /// Event timestamp.
        timestamp: u64,
    },
    /// Keepalive response, sent only to the pinging session.
    Pong {
        /// Event timestamp.
        timestamp: u64,
    },
}

impl ServerEvent {
    /// The wire tag, for logging and metrics labels.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserJoin { .. } => "user_join",
            Self::UserLeave { .. } => "user_leave",
            Self::CursorMove { .. } => "cursor_move",
            Self::ComponentSelect { .. } => "component_select",
            Self::ComponentAdd(_) => "component_add",
            Self::ComponentUpdate(_) => "component_update",
            Self::ComponentDelete(_) => "component_delete",
            Self::StyleChange(_) => "style_change",
            Self::ContentChange(_) => "content_change",
            Self::ProjectLock { .. } => "project_lock",
            Self::ProjectUnlock { .. } => "project_unlock",
            Self::Pong { .. } => "pong",
        }
    }
}
