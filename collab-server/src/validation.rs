//! Input validation for untrusted data.
//!
//! Identity parameters arrive on the handshake query string and component
//! ids arrive inside events; all of them end up as map keys and broadcast
//! payloads, so they are validated before use.

use thiserror::Error;

/// Maximum length for project ids.
pub const MAX_PROJECT_ID_LEN: usize = 64;
/// Maximum length for user ids.
pub const MAX_USER_ID_LEN: usize = 64;
/// Maximum length for component ids (UUIDs are 36 chars).
pub const MAX_COMPONENT_ID_LEN: usize = 64;
/// Maximum length for display names.
pub const MAX_USER_NAME_LEN: usize = 128;
/// Maximum WebSocket message size.
pub const MAX_WS_MESSAGE_SIZE: usize = 65_536; // 64KB

/// Validation error types.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Project id exceeds maximum length.
    #[error("projectId too long (max {MAX_PROJECT_ID_LEN} chars)")]
    ProjectIdTooLong,
    /// Project id is empty or contains invalid characters.
    #[error("projectId contains invalid characters")]
    ProjectIdInvalidChars,
    /// User id exceeds maximum length.
    #[error("userId too long (max {MAX_USER_ID_LEN} chars)")]
    UserIdTooLong,
    /// User id is empty or contains invalid characters.
    #[error("userId contains invalid characters")]
    UserIdInvalidChars,
    /// Component id exceeds maximum length.
    #[error("componentId too long (max {MAX_COMPONENT_ID_LEN} chars)")]
    ComponentIdTooLong,
    /// Component id is empty or contains invalid characters.
    #[error("componentId contains invalid characters")]
    ComponentIdInvalidChars,
    /// Display name exceeds maximum length.
    #[error("userName too long (max {MAX_USER_NAME_LEN} chars)")]
    UserNameTooLong,
    /// Display name contains control characters.
    #[error("userName contains control characters")]
    UserNameInvalidChars,
    /// WebSocket message exceeds maximum size.
    #[error("message too large (max {MAX_WS_MESSAGE_SIZE} bytes)")]
    MessageTooLarge,
}

/// Check if a character is valid for ids (alphanumeric, hyphen, or underscore).
fn is_valid_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Validate a project id.
///
/// # Errors
///
/// Returns [`ValidationError::ProjectIdTooLong`] past 64 characters,
/// [`ValidationError::ProjectIdInvalidChars`] when empty or containing
/// characters outside `[A-Za-z0-9_-]`.
pub fn validate_project_id(id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_PROJECT_ID_LEN {
        return Err(ValidationError::ProjectIdTooLong);
    }
    if id.is_empty() || !id.chars().all(is_valid_id_char) {
        return Err(ValidationError::ProjectIdInvalidChars);
    }
    Ok(())
}

/// Validate a user id.
///
/// # Errors
///
/// Returns [`ValidationError::UserIdTooLong`] past 64 characters,
/// [`ValidationError::UserIdInvalidChars`] when empty or containing
/// characters outside `[A-Za-z0-9_-]`.
pub fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_USER_ID_LEN {
        return Err(ValidationError::UserIdTooLong);
    }
    if id.is_empty() || !id.chars().all(is_valid_id_char) {
        return Err(ValidationError::UserIdInvalidChars);
    }
    Ok(())
}

/// Validate a component id.
///
/// # Errors
///
/// Returns [`ValidationError::ComponentIdTooLong`] past 64 characters,
/// [`ValidationError::ComponentIdInvalidChars`] when empty or containing
/// characters outside `[A-Za-z0-9_-]`.
pub fn validate_component_id(id: &str) -> Result<(), ValidationError> {
    if id.len() > MAX_COMPONENT_ID_LEN {
        return Err(ValidationError::ComponentIdTooLong);
    }
    if id.is_empty() || !id.chars().all(is_valid_id_char) {
        return Err(ValidationError::ComponentIdInvalidChars);
    }
    Ok(())
}

/// Validate a display name. Any printable text is fine; control characters
/// and oversized names are not.
///
/// # Errors
///
/// Returns [`ValidationError::UserNameTooLong`] past 128 characters,
/// [`ValidationError::UserNameInvalidChars`] on control characters.
pub fn validate_user_name(name: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_USER_NAME_LEN {
        return Err(ValidationError::UserNameTooLong);
    }
    if name.chars().any(char::is_control) {
        return Err(ValidationError::UserNameInvalidChars);
    }
    Ok(())
}

/// Validate WebSocket message size.
///
/// # Errors
///
/// Returns [`ValidationError::MessageTooLarge`] past 64KB.
pub fn validate_message_size(size: usize) -> Result<(), ValidationError> {
    if size > MAX_WS_MESSAGE_SIZE {
        return Err(ValidationError::MessageTooLarge);
    }
    Ok(())
}
