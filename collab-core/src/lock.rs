//! Advisory component locks.
//!
//! A lock is a time-bounded exclusive claim on one document component,
//! used to keep two users out of the same component rather than to merge
//! their edits. Expiry is evaluated lazily against an explicit clock; a
//! lock past its `expires_at` is treated as absent wherever it is read.

use serde::{Deserialize, Serialize};

/// Strength of a component lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockType {
    /// Full exclusive editing claim.
    #[default]
    Edit,
    /// Advisory claim on style properties only.
    Style,
    /// Advisory claim on text content only.
    Content,
}

impl std::fmt::Display for LockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Edit => write!(f, "edit"),
            Self::Style => write!(f, "style"),
            Self::Content => write!(f, "content"),
        }
    }
}

/// A live claim on one component within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLock {
    /// The component this lock covers.
    pub component_id: String,
    /// User holding the lock.
    pub user_id: String,
    /// Session that acquired (or last refreshed) the lock.
    pub session_id: String,
    /// Claim strength.
    pub lock_type: LockType,
    /// Unix-ms timestamp of acquisition or last refresh.
    pub locked_at: u64,
    /// Unix-ms timestamp past which the lock no longer counts.
    pub expires_at: u64,
}

impl ProjectLock {
    /// Create a lock valid for `duration_ms` from `now_ms`.
    #[must_use]
    pub fn new(
        component_id: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        lock_type: LockType,
        now_ms: u64,
        duration_ms: u64,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            user_id: user_id.into(),
            session_id: session_id.into(),
            lock_type,
            locked_at: now_ms,
            expires_at: now_ms + duration_ms,
        }
    }

    /// Whether the lock has lapsed at `now_ms`.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    /// Whether `(user_id, session_id)` is the holder of this lock.
    #[must_use]
    pub fn held_by(&self, user_id: &str, session_id: &str) -> bool {
        self.user_id == user_id && self.session_id == session_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_expires_strictly_after_deadline() {
        let lock = ProjectLock::new("btn1", "alice", "s-1", LockType::Edit, 1_000, 30_000);
        assert_eq!(lock.expires_at, 31_000);
        assert!(!lock.is_expired(31_000));
        assert!(lock.is_expired(31_001));
    }

    #[test]
    fn held_by_matches_both_ids() {
        let lock = ProjectLock::new("btn1", "alice", "s-1", LockType::Edit, 0, 1);
        assert!(lock.held_by("alice", "s-1"));
        assert!(!lock.held_by("alice", "s-2"));
        assert!(!lock.held_by("bob", "s-1"));
    }

    #[test]
    fn lock_serializes_camel_case_with_snake_case_type() {
        let lock = ProjectLock::new("btn1", "alice", "s-1", LockType::Content, 5, 10);
        let json = serde_json::to_value(&lock).expect("should serialize");
        assert_eq!(json["componentId"], "btn1");
        assert_eq!(json["lockType"], "content");
        assert_eq!(json["lockedAt"], 5);
        assert_eq!(json["expiresAt"], 15);
    }

    #[test]
    fn lock_type_defaults_to_edit() {
        assert_eq!(LockType::default(), LockType::Edit);
        let parsed: LockType = serde_json::from_str("\"edit\"").expect("should parse");
        assert_eq!(parsed, LockType::Edit);
    }
}
