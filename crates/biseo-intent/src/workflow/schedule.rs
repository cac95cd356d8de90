//! Calendar add / query / delete / update.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use biseo_adapters::{CalendarBackend, CalendarEvent};
use biseo_store::{Clock, StoreError, new_session_id};
use chrono::{DateTime, FixedOffset};
use tracing::{info, instrument};

use super::form::{EventEdit, edit_form};
use super::planner::SchedulePlanner;
use super::reply::{Button, ButtonStyle, FailureKind, Reply, truncate_title};
use super::settle;
use crate::config::WorkflowConfig;
use crate::error::Result;
use crate::matching::{CandidateMatch, Decision, MatchPolicy, decide, rank};
use crate::session::{
    CallbackAction, CallbackId, ConfirmationSession, SessionKind, SessionPayload, Sessions,
};

type EventSession = ConfirmationSession<CalendarEvent>;

/// Orchestrates calendar requests and their confirmations.
pub struct ScheduleWorkflow {
    calendar: Arc<dyn CalendarBackend>,
    planner: SchedulePlanner,
    sessions: Arc<Sessions>,
    clock: Arc<dyn Clock>,
    config: WorkflowConfig,
}

impl ScheduleWorkflow {
    pub fn new(
        calendar: Arc<dyn CalendarBackend>,
        planner: SchedulePlanner,
        sessions: Arc<Sessions>,
        clock: Arc<dyn Clock>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            calendar,
            planner,
            sessions,
            clock,
            config,
        }
    }

    fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.config.timezone)
    }

    fn title(&self, event: &CalendarEvent) -> String {
        truncate_title(&event.summary, self.config.title_display_chars)
    }

    /// One display line per event, title shortened.
    fn line(&self, event: &CalendarEvent) -> String {
        let shortened = CalendarEvent {
            summary: self.title(event),
            ..event.clone()
        };
        shortened.to_string()
    }

    fn ttl(&self, kind: SessionKind) -> Duration {
        match kind {
            SessionKind::Listing => self.config.query_session_ttl,
            _ => self.config.delete_session_ttl,
        }
    }

    fn open_session(
        &self,
        user_id: &str,
        kind: SessionKind,
        candidates: Vec<CandidateMatch<CalendarEvent>>,
        origin_keyword: &str,
        description: &str,
    ) -> EventSession {
        let session = ConfirmationSession {
            session_id: new_session_id(user_id),
            kind,
            candidates,
            origin_keyword: origin_keyword.to_string(),
            description: description.to_string(),
            user_id: user_id.to_string(),
            created_at: self.clock.now(),
            resolved: Default::default(),
        };
        self.store(session.clone());
        info!(
            session_id = %session.session_id,
            ?kind,
            candidates = session.candidates.len(),
            "schedule session opened"
        );
        session
    }

    fn store(&self, session: EventSession) {
        let ttl = self.ttl(session.kind);
        let id = session.session_id.clone();
        let owner = session.user_id.clone();
        self.sessions
            .put(&id, &owner, SessionPayload::Schedule(session), ttl);
    }

    /// Take the session for a destructive action.  A session of the wrong
    /// kind is put back and reported as missing.
    fn claim(&self, user_id: &str, session_id: &str, accepted: &[SessionKind]) -> Result<EventSession> {
        match self.sessions.take(session_id, user_id)? {
            SessionPayload::Schedule(session) if accepted.contains(&session.kind) => Ok(session),
            other => {
                self.sessions
                    .put(session_id, user_id, other, self.config.delete_session_ttl);
                Err(StoreError::SessionNotFound {
                    id: session_id.to_string(),
                }
                .into())
            }
        }
    }

    fn peek(&self, user_id: &str, session_id: &str) -> Result<EventSession> {
        match self.sessions.get(session_id, user_id)? {
            SessionPayload::Schedule(session) => Ok(session),
            _ => Err(StoreError::SessionNotFound {
                id: session_id.to_string(),
            }
            .into()),
        }
    }

    // ── add ────────────────────────────────────────────────────────────

    /// Insert one event described by `utterance`.
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: &str, utterance: &str) -> Reply {
        settle("schedule.add", self.try_add(utterance).await)
    }

    async fn try_add(&self, utterance: &str) -> Result<Reply> {
        let draft = self.planner.draft_event(utterance, self.now()).await?;
        let event = self.calendar.insert_event(&draft).await?;
        info!(event_id = %event.id, "event added");
        Ok(Reply::success(format!("일정을 추가했습니다.\n{}", self.line(&event))))
    }

    // ── query ──────────────────────────────────────────────────────────

    /// List events in `period`, each with edit and delete actions.
    #[instrument(skip(self))]
    pub async fn query(&self, user_id: &str, period: &str) -> Reply {
        settle("schedule.query", self.try_query(user_id, period).await)
    }

    async fn try_query(&self, user_id: &str, period: &str) -> Result<Reply> {
        let range = self.planner.ranges().resolve(period, self.now()).await;
        let events = self.calendar.list_events(range.start, range.end).await?;
        if events.is_empty() {
            return Ok(Reply::success(format!("{} 일정이 없습니다.", range.description)));
        }

        let candidates = events
            .into_iter()
            .map(|item| CandidateMatch { item, score: 1.0 })
            .collect();
        let session = self.open_session(
            user_id,
            SessionKind::Listing,
            candidates,
            period,
            &range.description,
        );

        let mut message = format!("{} 일정입니다.", range.description);
        let mut buttons = Vec::new();
        for (index, candidate) in session.candidates.iter().enumerate() {
            let n = index + 1;
            message.push_str(&format!("\n{n}. {}", self.line(&candidate.item)));
            buttons.push(Button::new(
                format!("{n}번 수정"),
                CallbackId::new(CallbackAction::ScheduleEdit, &session.session_id, index),
                ButtonStyle::Default,
            ));
            buttons.push(Button::new(
                format!("{n}번 삭제"),
                CallbackId::new(CallbackAction::ScheduleDelete, &session.session_id, index),
                ButtonStyle::Danger,
            ));
        }
        Ok(Reply::success(message).with_buttons(buttons))
    }

    // ── delete ─────────────────────────────────────────────────────────

    async fn search(
        &self,
        utterance: &str,
        period: &str,
    ) -> Result<(String, String, Vec<CandidateMatch<CalendarEvent>>)> {
        let (keyword, range) = self
            .planner
            .deletion_query(utterance, period, self.now())
            .await?;
        let events = self.calendar.list_events(range.start, range.end).await?;
        let ranked = rank(&keyword, events, self.config.match_floor, |e| e.summary.as_str());
        info!(keyword = %keyword, survivors = ranked.len(), "events scored");
        Ok((keyword, range.description, ranked))
    }

    fn no_match(keyword: &str) -> Reply {
        Reply::failure(
            FailureKind::NoMatch,
            format!("'{keyword}'와(과) 비슷한 일정을 찾지 못했습니다."),
        )
    }

    /// Delete the event the user means, asking first unless exactly one
    /// candidate is a confident match.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str, utterance: &str, period: &str) -> Reply {
        settle("schedule.delete", self.try_delete(user_id, utterance, period).await)
    }

    async fn try_delete(&self, user_id: &str, utterance: &str, period: &str) -> Result<Reply> {
        let (keyword, description, ranked) = self.search(utterance, period).await?;
        match decide(ranked, &MatchPolicy::schedule(&self.config)) {
            Decision::NoMatch => Ok(Self::no_match(&keyword)),
            Decision::AutoCommit(only) => {
                self.calendar.delete_event(&only.item.id).await?;
                info!(event_id = %only.item.id, score = only.score, "event deleted without confirmation");
                Ok(Reply::success(format!(
                    "'{}' 일정을 삭제했습니다.",
                    self.title(&only.item)
                )))
            }
            Decision::Confirm(candidates) => {
                let session = self.open_session(
                    user_id,
                    SessionKind::Deletion,
                    candidates,
                    &keyword,
                    &description,
                );
                let mut message = format!("삭제할 일정을 선택해 주세요. ({description})");
                let mut buttons = Vec::new();
                for (index, candidate) in session.candidates.iter().enumerate() {
                    message.push_str(&format!("\n{}. {}", index + 1, self.line(&candidate.item)));
                    buttons.push(Button::new(
                        self.title(&candidate.item),
                        CallbackId::new(CallbackAction::ScheduleDelete, &session.session_id, index),
                        ButtonStyle::Danger,
                    ));
                }
                buttons.push(Button::new(
                    "취소",
                    CallbackId::new(CallbackAction::ScheduleCancel, &session.session_id, 0),
                    ButtonStyle::Default,
                ));
                Ok(Reply::success(message).with_buttons(buttons))
            }
        }
    }

    /// Delete candidate `index` of a deletion or listing session.
    #[instrument(skip(self))]
    pub async fn execute_delete(&self, user_id: &str, session_id: &str, index: usize) -> Reply {
        settle(
            "schedule.execute_delete",
            self.try_execute_delete(user_id, session_id, index).await,
        )
    }

    async fn try_execute_delete(&self, user_id: &str, session_id: &str, index: usize) -> Result<Reply> {
        let session = self.claim(
            user_id,
            session_id,
            &[SessionKind::Deletion, SessionKind::Listing],
        )?;
        let Some(event) = session.candidate(index).map(|c| c.item.clone()) else {
            self.store(session);
            return Ok(Reply::session_expired());
        };

        if let Err(e) = self.calendar.delete_event(&event.id).await {
            self.store(session);
            return Err(e.into());
        }
        info!(event_id = %event.id, "event deleted after confirmation");
        Ok(Reply::success(format!("'{}' 일정을 삭제했습니다.", self.title(&event))))
    }

    /// Drop a deletion session without touching the calendar.
    pub fn cancel(&self, user_id: &str, session_id: &str) -> Reply {
        let result = self
            .claim(user_id, session_id, &[SessionKind::Deletion, SessionKind::Update])
            .map(|_| Reply::success("일정 삭제를 취소했습니다."));
        settle("schedule.cancel", result)
    }

    // ── update ─────────────────────────────────────────────────────────

    /// Offer events matching `utterance` for editing.  Never edits on its
    /// own, since the new values come from the form.
    #[instrument(skip(self))]
    pub async fn find_for_update(&self, user_id: &str, utterance: &str, period: &str) -> Reply {
        settle(
            "schedule.find_for_update",
            self.try_find_for_update(user_id, utterance, period).await,
        )
    }

    async fn try_find_for_update(&self, user_id: &str, utterance: &str, period: &str) -> Result<Reply> {
        let (keyword, description, mut ranked) = self.search(utterance, period).await?;
        if ranked.is_empty() {
            return Ok(Self::no_match(&keyword));
        }
        ranked.truncate(self.config.max_delete_candidates);

        let session = self.open_session(user_id, SessionKind::Update, ranked, &keyword, &description);
        let mut message = format!("수정할 일정을 선택해 주세요. ({description})");
        let mut buttons = Vec::new();
        for (index, candidate) in session.candidates.iter().enumerate() {
            message.push_str(&format!("\n{}. {}", index + 1, self.line(&candidate.item)));
            buttons.push(Button::new(
                self.title(&candidate.item),
                CallbackId::new(CallbackAction::ScheduleEdit, &session.session_id, index),
                ButtonStyle::Primary,
            ));
        }
        buttons.push(Button::new(
            "취소",
            CallbackId::new(CallbackAction::ScheduleCancel, &session.session_id, 0),
            ButtonStyle::Default,
        ));
        Ok(Reply::success(message).with_buttons(buttons))
    }

    /// Present the edit form for candidate `index`.  The session stays.
    pub fn open_edit_form(&self, user_id: &str, session_id: &str, index: usize) -> Reply {
        let result = self.peek(user_id, session_id).map(|session| {
            match session.candidate(index) {
                Some(candidate) => Reply::success("수정할 내용을 입력해 주세요.").with_form(edit_form(
                    &candidate.item,
                    CallbackId::new(CallbackAction::ScheduleUpdate, session_id, index).to_string(),
                )),
                None => Reply::session_expired(),
            }
        });
        settle("schedule.open_edit_form", result)
    }

    /// Apply a submitted edit form to candidate `index`.
    ///
    /// Fields are validated before the session is touched.
    #[instrument(skip(self, fields))]
    pub async fn execute_update(
        &self,
        user_id: &str,
        session_id: &str,
        index: usize,
        fields: &HashMap<String, String>,
    ) -> Reply {
        settle(
            "schedule.execute_update",
            self.try_execute_update(user_id, session_id, index, fields).await,
        )
    }

    async fn try_execute_update(
        &self,
        user_id: &str,
        session_id: &str,
        index: usize,
        fields: &HashMap<String, String>,
    ) -> Result<Reply> {
        let edit = EventEdit::from_fields(fields)?;
        let session = self.claim(
            user_id,
            session_id,
            &[SessionKind::Update, SessionKind::Listing],
        )?;
        let Some(event) = session.candidate(index).map(|c| c.item.clone()) else {
            self.store(session);
            return Ok(Reply::session_expired());
        };

        let edited = edit.apply(&event, self.config.timezone);
        match self.calendar.update_event(&edited).await {
            Ok(updated) => {
                info!(event_id = %updated.id, "event updated");
                Ok(Reply::success(format!("일정을 수정했습니다.\n{}", self.line(&updated))))
            }
            Err(e) => {
                self.store(session);
                Err(e.into())
            }
        }
    }
}
