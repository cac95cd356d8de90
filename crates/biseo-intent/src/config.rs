//! Tunables shared by the classifier and the workflows.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

/// Korea Standard Time, UTC+09:00.
pub const KST_OFFSET_SECS: i32 = 9 * 3600;

/// Engine configuration.  `Default` matches production behaviour.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Offset used to interpret "today", wall-clock hours, and all-day dates.
    pub timezone: FixedOffset,
    /// Candidates must score strictly above this to be considered at all.
    pub match_floor: f64,
    /// A sole surviving candidate at or above this score is acted on directly.
    pub auto_commit_score: f64,
    /// Most candidates offered for a delete/update confirmation.
    pub max_delete_candidates: usize,
    pub delete_session_ttl: Duration,
    pub query_session_ttl: Duration,
    pub task_session_ttl: Duration,
    /// Upper bound on any single model call made by the engine.
    pub model_timeout: Duration,
    /// How long a remembered image keeps image-editing phrases routed to IMAGE.
    pub image_context_window: Duration,
    /// Recent turns included in the classification prompt.
    pub history_limit: usize,
    /// Titles longer than this are shortened in confirmations.
    pub title_display_chars: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            timezone: kst(),
            match_floor: 0.30,
            auto_commit_score: 0.80,
            max_delete_candidates: 5,
            delete_session_ttl: Duration::from_secs(10 * 60),
            query_session_ttl: Duration::from_secs(30 * 60),
            task_session_ttl: Duration::from_secs(10 * 60),
            model_timeout: Duration::from_secs(10),
            image_context_window: Duration::from_secs(30 * 60),
            history_limit: 5,
            title_display_chars: 30,
        }
    }
}

/// The default timezone.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(KST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}
