//! Schedule and task workflows, and the dispatcher that routes follow-up
//! actions back into them.
//!
//! Every public workflow operation returns a [`Reply`].  Errors are logged
//! and translated at the entry point; nothing escapes as `Err`.

pub mod dispatcher;
pub mod form;
pub mod planner;
pub mod reply;
pub mod schedule;
pub mod task;

use tracing::{error, warn};

pub use dispatcher::Dispatcher;
pub use form::{EventEdit, normalize_time, validate_date};
pub use planner::{SchedulePlanner, content_keyword};
pub use reply::{Button, ButtonStyle, Component, FailureKind, Form, FormField, Outcome, Reply};
pub use schedule::ScheduleWorkflow;
pub use task::{TaskWorkflow, parse_task_items};

use crate::error::{IntentError, Result};

/// Request endings that carry no content.
const REQUEST_ENDINGS: &[&str] = &["해줘", "해주세요", "해줄래", "해", "줘", "주세요", "부탁해"];

/// Object and topic particles trimmed from the end of a token.
const PARTICLES: &[char] = &['을', '를', '은', '는'];

fn trim_particle(token: &str) -> &str {
    match token.strip_suffix(PARTICLES) {
        Some(stem) if stem.chars().count() >= 2 => stem,
        _ => token,
    }
}

/// `text` without tokens that contain any of `verbs`, request endings, or
/// `fillers`, and with trailing particles trimmed.
pub(crate) fn keep_content(text: &str, verbs: &[&[&str]], fillers: &[&str]) -> String {
    text.split_whitespace()
        .filter(|token| {
            !verbs.iter().any(|set| set.iter().any(|v| token.contains(v)))
                && !REQUEST_ENDINGS.contains(token)
                && !fillers.contains(token)
        })
        .map(trim_particle)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn the result of an operation into the reply the user sees.
pub(crate) fn settle(operation: &str, result: Result<Reply>) -> Reply {
    match result {
        Ok(reply) => reply,
        Err(e) => {
            match &e {
                IntentError::Adapter(_)
                | IntentError::Agent(_)
                | IntentError::ModelTimeout { .. } => {
                    error!(operation, error = %e, "backend failure")
                }
                _ => warn!(operation, error = %e, "operation failed"),
            }
            Reply::from_error(&e)
        }
    }
}
