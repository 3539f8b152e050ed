//! Error types for collaboration operations.

use thiserror::Error;

use crate::lock::ProjectLock;

/// Result type for collaboration operations.
pub type CollabResult<T> = Result<T, CollabError>;

/// Errors that can occur in the collaboration core.
///
/// Every variant is session-local: a failure is reported to (at most) the
/// session that caused it and never tears down another session or project.
#[derive(Debug, Error)]
pub enum CollabError {
    /// The project already has the maximum number of attached sessions.
    #[error("Project {0} is at capacity")]
    ProjectFull(String),

    /// The target component is locked by another live session.
    ///
    /// Carries the conflicting lock so the requester can show who holds it.
    #[error("Component {} is locked by another user", .0.component_id)]
    LockHeld(Box<ProjectLock>),

    /// The requested project has no collaboration state.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// An event payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
