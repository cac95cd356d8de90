//! Error types for the biseo-store crate.

use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the ephemeral stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The session does not exist, was already consumed, or has expired.
    #[error("session not found or expired: {id}")]
    SessionNotFound { id: String },

    /// The session exists but belongs to a different user.
    #[error("session {id} is not owned by {user_id}")]
    ForeignSession { id: String, user_id: String },
}
