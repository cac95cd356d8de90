//! Confirmation sessions and the callback ids that point into them.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use biseo_adapters::{CalendarEvent, TaskItem};
use biseo_store::SessionStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IntentError, Result};
use crate::matching::CandidateMatch;

/// Why a session was opened.  Decides which actions may consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// A query result; every entry can be edited or deleted.
    Listing,
    /// Ambiguous delete request.
    Deletion,
    /// Ambiguous update request.
    Update,
    /// Ambiguous or listed task completion.
    Completion,
}

/// Candidates waiting for the user to pick one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationSession<T> {
    pub session_id: String,
    pub kind: SessionKind,
    /// Fixed order; callback indices point into this list.
    pub candidates: Vec<CandidateMatch<T>>,
    pub origin_keyword: String,
    pub description: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Indices already acted on.  Their slots stay in `candidates` so the
    /// remaining buttons keep pointing at the same entries.
    #[serde(default)]
    pub resolved: BTreeSet<usize>,
}

impl<T> ConfirmationSession<T> {
    /// The candidate behind `index`, unless it is out of range or resolved.
    pub fn candidate(&self, index: usize) -> Option<&CandidateMatch<T>> {
        if self.resolved.contains(&index) {
            return None;
        }
        self.candidates.get(index)
    }

    /// Mark `index` as acted on and return its candidate.  `None` when the
    /// slot does not exist or was already resolved.
    pub fn resolve(&mut self, index: usize) -> Option<&CandidateMatch<T>> {
        if index >= self.candidates.len() || !self.resolved.insert(index) {
            return None;
        }
        self.candidates.get(index)
    }

    /// Undo [`resolve`](Self::resolve) after the action failed.
    pub fn reopen(&mut self, index: usize) {
        self.resolved.remove(&index);
    }

    /// Unresolved candidates with their original indices.
    pub fn open_candidates(&self) -> impl Iterator<Item = (usize, &CandidateMatch<T>)> {
        self.candidates
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.resolved.contains(index))
    }

    pub fn is_exhausted(&self) -> bool {
        self.open_candidates().next().is_none()
    }
}

/// Everything the engine keeps in the session store.
#[derive(Debug, Clone)]
pub enum SessionPayload {
    Schedule(ConfirmationSession<CalendarEvent>),
    Task(ConfirmationSession<TaskItem>),
    /// Results kept by services outside this crate (file search, for
    /// example).  The schedule and task actions never consume one: a
    /// callback that lands on it reads as expired and the payload stays.
    Raw(serde_json::Value),
}

/// The store shared by all workflows.
pub type Sessions = SessionStore<SessionPayload>;

/// A button or form action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackAction {
    ScheduleDelete,
    ScheduleCancel,
    /// Open the edit form for one event.
    ScheduleEdit,
    /// Submit the edit form.
    ScheduleUpdate,
    TaskComplete,
    TaskCancel,
}

impl CallbackAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScheduleDelete => "schedule_delete",
            Self::ScheduleCancel => "schedule_cancel",
            Self::ScheduleEdit => "schedule_edit",
            Self::ScheduleUpdate => "schedule_update",
            Self::TaskComplete => "task_complete",
            Self::TaskCancel => "task_cancel",
        }
    }
}

impl FromStr for CallbackAction {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "schedule_delete" => Self::ScheduleDelete,
            "schedule_cancel" => Self::ScheduleCancel,
            "schedule_edit" => Self::ScheduleEdit,
            "schedule_update" => Self::ScheduleUpdate,
            "task_complete" => Self::TaskComplete,
            "task_cancel" => Self::TaskCancel,
            other => return Err(IntentError::parse(format!("unknown callback action `{other}`"))),
        })
    }
}

/// `action:session_id:index`, the opaque id carried by buttons and forms.
///
/// Session ids may contain `:` themselves, so the action is split off the
/// front and the index off the back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackId {
    pub action: CallbackAction,
    pub session_id: String,
    pub index: usize,
}

impl CallbackId {
    pub fn new(action: CallbackAction, session_id: &str, index: usize) -> Self {
        Self {
            action,
            session_id: session_id.to_string(),
            index,
        }
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.action.as_str(), self.session_id, self.index)
    }
}

impl FromStr for CallbackId {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self> {
        let (action, rest) = s
            .split_once(':')
            .ok_or_else(|| IntentError::parse(format!("malformed callback id `{s}`")))?;
        let (session_id, index) = rest
            .rsplit_once(':')
            .ok_or_else(|| IntentError::parse(format!("malformed callback id `{s}`")))?;
        if session_id.is_empty() {
            return Err(IntentError::parse(format!("callback id `{s}` has no session")));
        }
        let index = index
            .parse()
            .map_err(|_| IntentError::parse(format!("callback id `{s}` has a bad index")))?;
        Ok(Self {
            action: action.parse()?,
            session_id: session_id.to_string(),
            index,
        })
    }
}
