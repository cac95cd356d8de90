//! Agent error types.
//!
//! Everything that can go wrong between us and a language-model provider
//! surfaces as an [`AgentError`].  Callers in the intent engine treat every
//! variant the same way ("no result"), but the variants keep logs useful.

/// Unified error type for the model client.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// An HTTP request to the provider failed or returned a non-2xx status.
    #[error("llm request failed: {reason}")]
    LlmRequestFailed { reason: String },

    /// The provider answered, but not in the shape we expected.
    #[error("llm response parse error: {reason}")]
    LlmParseFailed { reason: String },

    /// The API key is missing for a provider that requires one.
    #[error("missing api key for provider: {provider}")]
    MissingApiKey { provider: String },

    /// The call did not finish within its time budget.
    #[error("llm call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the agent crate.
pub type Result<T> = std::result::Result<T, AgentError>;

impl From<reqwest::Error> for AgentError {
    fn from(err: reqwest::Error) -> Self {
        Self::LlmRequestFailed {
            reason: err.to_string(),
        }
    }
}
