//! To-do add / query / complete.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use biseo_adapters::{AdapterError, TaskBackend, TaskDraft, TaskItem, TaskStatus};
use biseo_store::{Clock, StoreError, new_session_id};
use futures::future::join_all;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::reply::{Button, ButtonStyle, FailureKind, Reply, truncate_title};
use super::{keep_content, settle};
use crate::config::WorkflowConfig;
use crate::error::Result;
use crate::keywords::{TASK_ADD_VERBS, TASK_COMPLETE_VERBS};
use crate::matching::{CandidateMatch, Decision, MatchPolicy, decide, rank};
use crate::session::{
    CallbackAction, CallbackId, ConfirmationSession, SessionKind, SessionPayload, Sessions,
};

type TaskSession = ConfirmationSession<TaskItem>;

/// Tokens that name the to-do list rather than a task.
const TASK_FILLERS: &[&str] = &[
    "할일", "할일에", "할일로", "할일을", "할", "일", "일에", "일로", "투두", "todo", "목록",
    "목록에", "리스트", "리스트에", "태스크", "좀",
];

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•·▪]|\d{1,3}[.)]|[①-⑳])\s*").expect("literal regex")
});

/// Split a request into task titles.
///
/// Bullet lists, numbered lists, and one-per-line blocks give one task per
/// item; plain lines that carry a command verb or end in `:` are headers and
/// are dropped.  A single line is cleaned of verbs, split after `:` if
/// present, and then split on commas.
pub fn parse_task_items(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let listed = lines.iter().any(|l| LIST_MARKER.is_match(l));
    if lines.len() > 1 || listed {
        return lines
            .into_iter()
            .filter_map(|line| match LIST_MARKER.find(line) {
                Some(marker) => Some(line[marker.end()..].trim()),
                None if is_header(line) => None,
                None => Some(line),
            })
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
    }

    let Some(line) = lines.first() else {
        return Vec::new();
    };
    let body = match line.split_once(':') {
        Some((_, after)) => after.trim().to_string(),
        None => keep_content(line, &[TASK_ADD_VERBS], TASK_FILLERS),
    };
    body.split([',', '、'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_header(line: &str) -> bool {
    line.ends_with(':') || TASK_ADD_VERBS.iter().any(|v| line.contains(v))
}

/// Task title the user wants to mark done.
fn completion_keyword(content: &str) -> String {
    keep_content(content, &[TASK_COMPLETE_VERBS], TASK_FILLERS)
}

/// Orchestrates to-do requests and their confirmations.
pub struct TaskWorkflow {
    tasks: Arc<dyn TaskBackend>,
    sessions: Arc<Sessions>,
    clock: Arc<dyn Clock>,
    config: WorkflowConfig,
}

impl TaskWorkflow {
    pub fn new(
        tasks: Arc<dyn TaskBackend>,
        sessions: Arc<Sessions>,
        clock: Arc<dyn Clock>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            tasks,
            sessions,
            clock,
            config,
        }
    }

    fn title(&self, task: &TaskItem) -> String {
        truncate_title(&task.title, self.config.title_display_chars)
    }

    fn ttl(&self, kind: SessionKind) -> Duration {
        match kind {
            SessionKind::Listing => self.config.query_session_ttl,
            _ => self.config.task_session_ttl,
        }
    }

    fn store(&self, session: TaskSession) {
        let ttl = self.ttl(session.kind);
        let id = session.session_id.clone();
        let owner = session.user_id.clone();
        self.sessions.put(&id, &owner, SessionPayload::Task(session), ttl);
    }

    fn open_session(
        &self,
        user_id: &str,
        kind: SessionKind,
        candidates: Vec<CandidateMatch<TaskItem>>,
        origin_keyword: &str,
    ) -> TaskSession {
        let session = ConfirmationSession {
            session_id: new_session_id(user_id),
            kind,
            candidates,
            origin_keyword: origin_keyword.to_string(),
            description: String::new(),
            user_id: user_id.to_string(),
            created_at: self.clock.now(),
            resolved: Default::default(),
        };
        self.store(session.clone());
        info!(
            session_id = %session.session_id,
            ?kind,
            candidates = session.candidates.len(),
            "task session opened"
        );
        session
    }

    /// One complete button per unresolved candidate, keyed by its original
    /// index.
    fn complete_buttons(&self, session: &TaskSession) -> Vec<Button> {
        session
            .open_candidates()
            .map(|(index, candidate)| {
                Button::new(
                    format!("✓ {}", self.title(&candidate.item)),
                    CallbackId::new(CallbackAction::TaskComplete, &session.session_id, index),
                    ButtonStyle::Primary,
                )
            })
            .collect()
    }

    fn listing(&self, session: &TaskSession) -> String {
        session
            .open_candidates()
            .enumerate()
            .map(|(n, (_, c))| format!("{}. {}", n + 1, self.title(&c.item)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    async fn open_tasks(&self) -> Result<Vec<TaskItem>> {
        let lists = self.tasks.list_task_lists().await?;
        let mut open = Vec::new();
        for list in lists {
            let tasks = self.tasks.list_tasks(&list.id, false).await?;
            open.extend(tasks.into_iter().filter(|t| !t.is_completed()));
        }
        Ok(open)
    }

    // ── add ────────────────────────────────────────────────────────────

    /// Add every task named in `content` to the first list.  Items are
    /// inserted independently; one failure does not stop the others.
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: &str, content: &str) -> Reply {
        settle("task.add", self.try_add(content).await)
    }

    async fn try_add(&self, content: &str) -> Result<Reply> {
        let items = parse_task_items(content);
        if items.is_empty() {
            return Ok(Reply::failure(
                FailureKind::ParseFailure,
                "추가할 할 일을 찾지 못했습니다.",
            ));
        }
        let list = self
            .tasks
            .list_task_lists()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AdapterError::NotFound {
                resource: "task list".into(),
            })?;

        let drafts: Vec<TaskDraft> = items.iter().map(TaskDraft::titled).collect();
        let results = join_all(
            drafts
                .iter()
                .map(|draft| self.tasks.insert_task(&list.id, draft)),
        )
        .await;

        let mut added = Vec::new();
        let mut failed = Vec::new();
        for (title, result) in items.iter().zip(results) {
            match result {
                Ok(task) => added.push(task),
                Err(e) => {
                    warn!(title = %title, error = %e, "task insert failed");
                    failed.push(title.as_str());
                }
            }
        }
        info!(added = added.len(), failed = failed.len(), "tasks added");

        if added.is_empty() {
            return Ok(Reply::failure(
                FailureKind::Backend,
                format!("할 일을 추가하지 못했습니다: {}", failed.join(", ")),
            ));
        }
        let mut message = format!("할 일 {}개를 추가했습니다.", added.len());
        for task in &added {
            message.push_str(&format!("\n• {}", self.title(task)));
        }
        if !failed.is_empty() {
            message.push_str(&format!("\n추가하지 못한 항목: {}", failed.join(", ")));
        }
        Ok(Reply::success(message))
    }

    // ── query ──────────────────────────────────────────────────────────

    /// List incomplete tasks across all lists, each with a complete action.
    #[instrument(skip(self))]
    pub async fn query(&self, user_id: &str) -> Reply {
        settle("task.query", self.try_query(user_id).await)
    }

    async fn try_query(&self, user_id: &str) -> Result<Reply> {
        let open = self.open_tasks().await?;
        if open.is_empty() {
            return Ok(Reply::success("남은 할 일이 없습니다."));
        }
        let candidates: Vec<_> = open
            .into_iter()
            .map(|item| CandidateMatch { item, score: 1.0 })
            .collect();
        let session = self.open_session(user_id, SessionKind::Listing, candidates, "");
        Ok(Reply::success(format!(
            "남은 할 일입니다.\n{}",
            self.listing(&session)
        ))
        .with_buttons(self.complete_buttons(&session)))
    }

    // ── complete ───────────────────────────────────────────────────────

    /// Mark the task named in `content` done, asking first unless exactly
    /// one candidate is a confident match.
    #[instrument(skip(self))]
    pub async fn complete(&self, user_id: &str, content: &str) -> Reply {
        settle("task.complete", self.try_complete(user_id, content).await)
    }

    async fn try_complete(&self, user_id: &str, content: &str) -> Result<Reply> {
        let keyword = completion_keyword(content);
        if keyword.is_empty() {
            return Ok(Reply::failure(
                FailureKind::ParseFailure,
                "완료할 할 일을 알려 주세요.",
            ));
        }
        let open = self.open_tasks().await?;
        let ranked = rank(&keyword, open, self.config.match_floor, |t| t.title.as_str());
        info!(keyword = %keyword, survivors = ranked.len(), "tasks scored");

        match decide(ranked, &MatchPolicy::task(&self.config)) {
            Decision::NoMatch => Ok(Reply::failure(
                FailureKind::NoMatch,
                format!("'{keyword}'와(과) 비슷한 할 일을 찾지 못했습니다."),
            )),
            Decision::AutoCommit(only) => {
                let task = &only.item;
                self.tasks
                    .patch_task_status(&task.list_id, &task.id, TaskStatus::Completed)
                    .await?;
                info!(task_id = %task.id, score = only.score, "task completed without confirmation");
                Ok(Reply::success(format!("'{}' 완료했습니다.", self.title(task))))
            }
            Decision::Confirm(candidates) => {
                let session = self.open_session(user_id, SessionKind::Completion, candidates, &keyword);
                let mut buttons = self.complete_buttons(&session);
                buttons.push(Button::new(
                    "취소",
                    CallbackId::new(CallbackAction::TaskCancel, &session.session_id, 0),
                    ButtonStyle::Default,
                ));
                Ok(Reply::success(format!(
                    "완료할 할 일을 선택해 주세요.\n{}",
                    self.listing(&session)
                ))
                .with_buttons(buttons))
            }
        }
    }

    /// Complete candidate `index` of a completion or listing session.
    #[instrument(skip(self))]
    pub async fn execute_complete(&self, user_id: &str, session_id: &str, index: usize) -> Reply {
        settle(
            "task.execute_complete",
            self.try_execute_complete(user_id, session_id, index).await,
        )
    }

    async fn try_execute_complete(&self, user_id: &str, session_id: &str, index: usize) -> Result<Reply> {
        let kind = match self.sessions.get(session_id, user_id)? {
            SessionPayload::Task(session) => session.kind,
            _ => return Ok(Reply::session_expired()),
        };
        if kind == SessionKind::Listing {
            return self.complete_from_listing(user_id, session_id, index).await;
        }

        let session = match self.sessions.take(session_id, user_id)? {
            SessionPayload::Task(session) => session,
            other => {
                self.sessions.put(session_id, user_id, other, self.config.task_session_ttl);
                return Ok(Reply::session_expired());
            }
        };
        let Some(task) = session.candidate(index).map(|c| c.item.clone()) else {
            self.store(session);
            return Ok(Reply::session_expired());
        };
        if let Err(e) = self
            .tasks
            .patch_task_status(&task.list_id, &task.id, TaskStatus::Completed)
            .await
        {
            self.store(session);
            return Err(e.into());
        }
        info!(task_id = %task.id, "task completed after confirmation");
        Ok(Reply::success(format!("'{}' 완료했습니다.", self.title(&task))))
    }

    /// Listing sessions survive completions.  The finished entry is marked
    /// resolved in place, so buttons for the other entries stay valid and a
    /// repeated press on the same button reads as expired.
    async fn complete_from_listing(&self, user_id: &str, session_id: &str, index: usize) -> Result<Reply> {
        let claimed = self.sessions.update(session_id, user_id, |payload| match payload {
            SessionPayload::Task(session) => session.resolve(index).map(|c| c.item.clone()),
            _ => None,
        })?;
        let Some(task) = claimed else {
            return Ok(Reply::session_expired());
        };

        if let Err(e) = self
            .tasks
            .patch_task_status(&task.list_id, &task.id, TaskStatus::Completed)
            .await
        {
            let reopened = self.sessions.update(session_id, user_id, |payload| {
                if let SessionPayload::Task(session) = payload {
                    session.reopen(index);
                }
            });
            if let Err(lost) = reopened {
                warn!(session_id, error = %lost, "listing expired before it could be restored");
            }
            return Err(e.into());
        }
        info!(task_id = %task.id, "task completed from listing");

        let remaining = self
            .sessions
            .update(session_id, user_id, |payload| match payload {
                SessionPayload::Task(session) => Some(session.clone()),
                _ => None,
            })
            .ok()
            .flatten();
        let message = format!("'{}' 완료했습니다.", self.title(&task));
        match remaining {
            Some(session) if !session.is_exhausted() => {
                Ok(Reply::success(format!("{message}\n{}", self.listing(&session)))
                    .with_buttons(self.complete_buttons(&session)))
            }
            _ => {
                self.sessions.remove(session_id);
                Ok(Reply::success(message))
            }
        }
    }

    /// Drop a completion session without touching any task.
    pub fn cancel(&self, user_id: &str, session_id: &str) -> Reply {
        let result: Result<Reply> = match self.sessions.take(session_id, user_id) {
            Ok(SessionPayload::Task(_)) => Ok(Reply::success("할 일 완료를 취소했습니다.")),
            Ok(other) => {
                self.sessions.put(session_id, user_id, other, self.config.task_session_ttl);
                Err(StoreError::SessionNotFound {
                    id: session_id.to_string(),
                }
                .into())
            }
            Err(e) => Err(e.into()),
        };
        settle("task.cancel", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bullets_and_numbers_give_one_task_each() {
        let items = parse_task_items("할 일 추가해줘:\n- 우유 사기\n- 보고서 작성\n3) 운동하기");
        assert_eq!(items, ["우유 사기", "보고서 작성", "운동하기"]);
    }

    #[test]
    fn plain_lines_are_tasks_but_headers_are_not() {
        let items = parse_task_items("다음 할 일 등록해줘\n장보기\n세탁소 들르기");
        assert_eq!(items, ["장보기", "세탁소 들르기"]);
    }

    #[test]
    fn single_line_is_cleaned_and_split() {
        assert_eq!(parse_task_items("우유 사기, 운동하기 추가해줘"), ["우유 사기", "운동하기"]);
        assert_eq!(parse_task_items("할 일: 장보기, 청소"), ["장보기", "청소"]);
        assert_eq!(parse_task_items("보고서 작성 할일에 넣어줘"), ["보고서 작성"]);
        assert!(parse_task_items("   ").is_empty());
    }

    #[test]
    fn completion_keyword_drops_verbs() {
        assert_eq!(completion_keyword("운동하기 완료 처리해줘"), "운동하기");
        assert_eq!(completion_keyword("보고서 작성 끝냈어"), "보고서 작성");
    }
}
