//! Adapter error types.
//!
//! Every backend surfaces failures through [`AdapterError`].  Workflows do
//! not distinguish between variants beyond logging them, but the variants
//! keep enough context for a useful log line.

/// Unified error type for calendar and task backends.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The addressed event, task, or list does not exist (or is gone).
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend is misconfigured (bad base URL, missing token).
    #[error("configuration error: {0}")]
    Config(String),

    /// The backend refused to serve the call.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
