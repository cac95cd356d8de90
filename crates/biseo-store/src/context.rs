//! Per-user conversation context consumed by the intent classifier.
//!
//! The classifier only reads context.  Whatever owns the conversation (the
//! CLI REPL, a chat bot) writes it.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;

/// One exchange between the user and the assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub assistant_text: String,
    pub at: DateTime<Utc>,
}

/// The most recent image the user sent or the assistant produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContext {
    /// Caption or prompt describing the image.
    pub description: String,
    pub at: DateTime<Utc>,
}

/// The most recent document the user shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContext {
    pub title: String,
    /// Short summary, if one was produced.
    pub summary: Option<String>,
    pub at: DateTime<Utc>,
}

/// Read-only view of a user's recent conversation.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Up to `limit` most recent turns, oldest first.
    async fn recent_conversations(&self, user_id: &str, limit: usize) -> Vec<ConversationTurn>;

    async fn last_image(&self, user_id: &str) -> Option<ImageContext>;

    async fn last_document(&self, user_id: &str) -> Option<DocumentContext>;
}

/// A provider with nothing to say.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoContext;

#[async_trait]
impl ContextProvider for NoContext {
    async fn recent_conversations(&self, _user_id: &str, _limit: usize) -> Vec<ConversationTurn> {
        Vec::new()
    }

    async fn last_image(&self, _user_id: &str) -> Option<ImageContext> {
        None
    }

    async fn last_document(&self, _user_id: &str) -> Option<DocumentContext> {
        None
    }
}

#[derive(Debug, Default)]
struct UserContext {
    turns: VecDeque<ConversationTurn>,
    image: Option<ImageContext>,
    document: Option<DocumentContext>,
}

/// Process-local context keeping a bounded window of turns per user.
pub struct InMemoryContext {
    users: DashMap<String, UserContext>,
    max_turns: usize,
    clock: Arc<dyn Clock>,
}

impl InMemoryContext {
    pub fn new(max_turns: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            users: DashMap::new(),
            max_turns: max_turns.max(1),
            clock,
        }
    }

    pub fn record_turn(&self, user_id: &str, user_text: &str, assistant_text: &str) {
        let at = self.clock.now();
        let mut ctx = self.users.entry(user_id.to_string()).or_default();
        ctx.turns.push_back(ConversationTurn {
            user_text: user_text.to_string(),
            assistant_text: assistant_text.to_string(),
            at,
        });
        while ctx.turns.len() > self.max_turns {
            ctx.turns.pop_front();
        }
    }

    pub fn remember_image(&self, user_id: &str, description: &str) {
        let at = self.clock.now();
        self.users.entry(user_id.to_string()).or_default().image = Some(ImageContext {
            description: description.to_string(),
            at,
        });
    }

    pub fn remember_document(&self, user_id: &str, title: &str, summary: Option<&str>) {
        let at = self.clock.now();
        self.users.entry(user_id.to_string()).or_default().document = Some(DocumentContext {
            title: title.to_string(),
            summary: summary.map(str::to_string),
            at,
        });
    }
}

#[async_trait]
impl ContextProvider for InMemoryContext {
    async fn recent_conversations(&self, user_id: &str, limit: usize) -> Vec<ConversationTurn> {
        let Some(ctx) = self.users.get(user_id) else {
            return Vec::new();
        };
        let skip = ctx.turns.len().saturating_sub(limit);
        ctx.turns.iter().skip(skip).cloned().collect()
    }

    async fn last_image(&self, user_id: &str) -> Option<ImageContext> {
        self.users.get(user_id).and_then(|ctx| ctx.image.clone())
    }

    async fn last_document(&self, user_id: &str) -> Option<DocumentContext> {
        self.users.get(user_id).and_then(|ctx| ctx.document.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn context() -> InMemoryContext {
        InMemoryContext::new(3, Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn keeps_bounded_window_oldest_first() {
        let ctx = context();
        for i in 0..5 {
            ctx.record_turn("u1", &format!("q{i}"), &format!("a{i}"));
        }
        let turns = ctx.recent_conversations("u1", 10).await;
        let texts: Vec<_> = turns.iter().map(|t| t.user_text.as_str()).collect();
        assert_eq!(texts, vec!["q2", "q3", "q4"]);

        let last_two = ctx.recent_conversations("u1", 2).await;
        assert_eq!(last_two[0].user_text, "q3");
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let ctx = context();
        ctx.remember_image("u1", "바다 사진");
        ctx.remember_document("u1", "회의록", None);
        assert!(ctx.last_image("u2").await.is_none());
        assert_eq!(ctx.last_image("u1").await.unwrap().description, "바다 사진");
        assert_eq!(ctx.last_document("u1").await.unwrap().title, "회의록");
    }

    #[tokio::test]
    async fn no_context_is_empty() {
        assert!(NoContext.recent_conversations("u1", 5).await.is_empty());
        assert!(NoContext.last_document("u1").await.is_none());
    }
}
