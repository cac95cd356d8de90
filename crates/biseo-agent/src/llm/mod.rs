//! LLM integration layer.
//!
//! - [`types`] -- Provider-agnostic messages and requests.
//! - [`client`] -- HTTP client for Anthropic and OpenAI-compatible APIs.
//! - [`json`] -- Pulls a JSON object out of a model's text answer.

pub mod client;
pub mod json;
pub mod types;

pub use client::{LlmClient, LlmClientConfig, LlmProvider};
pub use json::extract_json_object;
pub use types::{ChatRequest, Message, Role};
