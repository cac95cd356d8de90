//! The completion contract consumed by the intent engine.
//!
//! `complete(system, user, options) -> text` is all the engine needs from a
//! language model.  Keeping it behind a trait lets the classifier, the range
//! resolver, and the schedule planner run against a scripted fake in tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AgentError, Result};
use crate::llm::{ChatRequest, LlmClient, Message};

/// Per-call knobs for [`CompletionService::complete`].
#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    /// Ask for a single JSON object answer.
    pub json_mode: bool,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound on the whole call, enforced on top of the HTTP timeout.
    pub timeout: Duration,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            json_mode: false,
            max_tokens: 512,
            temperature: 0.0,
            timeout: Duration::from_secs(30),
        }
    }
}

impl CompletionOptions {
    /// Options for a JSON-object answer.
    pub fn json() -> Self {
        Self {
            json_mode: true,
            ..Self::default()
        }
    }

    /// Override the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A black-box text/JSON completion service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `user_prompt` under `system_prompt`.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<String>;
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: CompletionOptions,
    ) -> Result<String> {
        let request = ChatRequest {
            model: String::new(),
            messages: vec![Message::system(system_prompt), Message::user(user_prompt)],
            temperature: Some(options.temperature),
            max_tokens: Some(options.max_tokens),
            json_mode: options.json_mode,
        };

        tokio::time::timeout(options.timeout, self.chat(&request))
            .await
            .map_err(|_| AgentError::Timeout {
                seconds: options.timeout.as_secs(),
            })?
    }
}
