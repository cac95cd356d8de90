//! Language-model access for biseo.
//!
//! The intent engine never talks to a provider directly.  It goes through
//! the [`CompletionService`] seam, which [`LlmClient`] implements for the
//! Anthropic Messages API and any OpenAI-compatible Chat Completions API.
//!
//! ## Modules
//!
//! - [`llm`] -- HTTP client, wire types, and JSON answer extraction.
//! - [`completion`] -- The `complete(system, user, options)` contract.
//! - [`error`] -- Agent error types.

pub mod completion;
pub mod error;
pub mod llm;

pub use completion::{CompletionOptions, CompletionService};
pub use error::{AgentError, Result};
pub use llm::{
    ChatRequest, LlmClient, LlmClientConfig, LlmProvider, Message, Role, extract_json_object,
};
