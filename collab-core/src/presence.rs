//! User presence: the observable live state of one editor session.

use serde::{Deserialize, Serialize};

/// A 2-D cursor position in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorPosition {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

/// One connected editor session as the other participants see it.
///
/// A `user_id` identifies the person; a `session_id` identifies one open
/// editor tab, so the same user may appear several times with distinct
/// sessions. Presence is mutated only by events arriving on its own
/// session and is destroyed on disconnect or sweeper eviction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresence {
    /// Stable client identity supplied by the hosting application.
    pub user_id: String,
    /// Unique id of this connection instance.
    pub session_id: String,
    /// Display name shown next to the cursor.
    pub name: String,
    /// Avatar color assigned from the shared palette.
    pub color: String,
    /// Last reported cursor position, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorPosition>,
    /// Component currently selected in this session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_component: Option<String>,
    /// Whether the session has been heard from recently.
    pub is_active: bool,
    /// Unix-ms timestamp of the last inbound event on this session.
    pub last_seen: u64,
}

impl UserPresence {
    /// Create a fresh presence for a session that just joined.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        name: impl Into<String>,
        color: impl Into<String>,
        now_ms: u64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            name: name.into(),
            color: color.into(),
            cursor: None,
            selected_component: None,
            is_active: true,
            last_seen: now_ms,
        }
    }

    /// Record activity on this session.
    pub fn touch(&mut self, now_ms: u64) {
        self.last_seen = now_ms;
        self.is_active = true;
    }

    /// Whether this session has been silent past `threshold_ms` at `now_ms`.
    #[must_use]
    pub fn is_stale(&self, now_ms: u64, threshold_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_seen) > threshold_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_serializes_camel_case() {
        let mut presence = UserPresence::new("alice", "s-1", "Alice", "#FF6B6B", 1_000);
        presence.cursor = Some(CursorPosition { x: 12.0, y: 34.0 });
        presence.selected_component = Some("btn1".to_string());

        let json = serde_json::to_value(&presence).expect("should serialize");
        assert_eq!(json["userId"], "alice");
        assert_eq!(json["sessionId"], "s-1");
        assert_eq!(json["selectedComponent"], "btn1");
        assert_eq!(json["lastSeen"], 1_000);
        assert_eq!(json["isActive"], true);
        assert_eq!(json["cursor"]["x"], 12.0);
    }

    #[test]
    fn optional_fields_are_omitted_when_unset() {
        let presence = UserPresence::new("alice", "s-1", "Alice", "#FF6B6B", 0);
        let json = serde_json::to_value(&presence).expect("should serialize");
        assert!(json.get("cursor").is_none());
        assert!(json.get("selectedComponent").is_none());
    }

    #[test]
    fn staleness_is_strictly_past_threshold() {
        let presence = UserPresence::new("alice", "s-1", "Alice", "#FF6B6B", 1_000);
        assert!(!presence.is_stale(1_000, 500));
        assert!(!presence.is_stale(1_500, 500));
        assert!(presence.is_stale(1_501, 500));
    }

    #[test]
    fn touch_reactivates_session() {
        let mut presence = UserPresence::new("alice", "s-1", "Alice", "#FF6B6B", 1_000);
        presence.is_active = false;
        presence.touch(2_000);
        assert!(presence.is_active);
        assert_eq!(presence.last_seen, 2_000);
    }
}
