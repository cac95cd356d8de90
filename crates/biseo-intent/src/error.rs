//! Intent engine error types.
//!
//! Workflow entry points never return these; they are converted into a
//! failed [`Reply`](crate::workflow::Reply) at the boundary.  Inside the
//! engine they flow through `?` as usual.

/// Unified error type for the intent engine.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    // -- Parsing -------------------------------------------------------------
    /// A usable field could not be extracted from the utterance or from a
    /// model answer.
    #[error("failed to parse: {reason}")]
    ParseFailed { reason: String },

    /// A form field failed validation.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The model did not answer in time.
    #[error("model call timed out after {seconds}s")]
    ModelTimeout { seconds: u64 },

    // -- Upstream crate errors -----------------------------------------------
    #[error("agent error: {0}")]
    Agent(#[from] biseo_agent::AgentError),

    #[error("backend error: {0}")]
    Adapter(#[from] biseo_adapters::AdapterError),

    #[error("session error: {0}")]
    Store(#[from] biseo_store::StoreError),

    #[error("keyword table error: {0}")]
    KeywordTable(#[from] aho_corasick::BuildError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntentError {
    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        Self::ParseFailed {
            reason: reason.into(),
        }
    }

    pub(crate) fn validation(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the intent crate.
pub type Result<T> = std::result::Result<T, IntentError>;
