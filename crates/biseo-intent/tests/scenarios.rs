//! End-to-end conversations against in-memory backends and a manual clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use biseo_adapters::{CalendarEvent, EventTime, MemoryCalendar, MemoryTasks, TaskStatus};
use biseo_agent::{CompletionOptions, CompletionService};
use biseo_intent::{
    Assistant, Button, Category, ClassificationSource, FailureKind, InboundMessage, Intent,
    Reply, ScheduleAction, SessionPayload,
};
use biseo_store::ManualClock;
use chrono::{DateTime, TimeDelta, Utc};

const USER: &str = "U1";

/// 2026-03-04 (Wednesday) 10:00 KST.
fn start() -> DateTime<Utc> {
    "2026-03-04T01:00:00Z".parse().unwrap()
}

fn event(id: &str, summary: &str, start: &str, minutes: i64) -> CalendarEvent {
    let start = DateTime::parse_from_rfc3339(start).unwrap();
    CalendarEvent {
        id: id.into(),
        summary: summary.into(),
        description: None,
        start: EventTime::timed(start),
        end: EventTime::timed(start + TimeDelta::minutes(minutes)),
    }
}

/// A model that answers every prompt with the same text.
struct Scripted(&'static str);

#[async_trait]
impl CompletionService for Scripted {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _options: CompletionOptions,
    ) -> biseo_agent::Result<String> {
        Ok(self.0.to_string())
    }
}

struct Harness {
    assistant: Assistant,
    calendar: Arc<MemoryCalendar>,
    tasks: Arc<MemoryTasks>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new(events: Vec<CalendarEvent>) -> Self {
        let calendar = Arc::new(MemoryCalendar::with_events(events));
        let tasks = Arc::new(MemoryTasks::new());
        let clock = Arc::new(ManualClock::new(start()));
        let assistant = Assistant::builder(calendar.clone(), tasks.clone())
            .clock(clock.clone())
            .build()
            .unwrap();
        Self {
            assistant,
            calendar,
            tasks,
            clock,
        }
    }

    fn with_meetings() -> Self {
        Self::new(vec![
            event("evt-am", "오전 회의", "2026-03-04T09:00:00+09:00", 60),
            event("evt-team", "팀 회의", "2026-03-04T14:00:00+09:00", 60),
            event("evt-lunch", "점심 약속", "2026-03-04T12:00:00+09:00", 60),
        ])
    }

    async fn say(&self, text: &str) -> Reply {
        self.assistant
            .handle_message(&InboundMessage::new(USER, text))
            .await
            .reply
            .expect("handled by the engine")
    }

    async fn press(&self, button: &Button) -> Reply {
        self.press_as(USER, button).await
    }

    async fn press_as(&self, user: &str, button: &Button) -> Reply {
        self.assistant
            .dispatcher()
            .on_button_activated(user, &button.callback_id)
            .await
    }

    async fn submit(&self, callback_id: &str, fields: &[(&str, &str)]) -> Reply {
        let fields: HashMap<String, String> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.assistant
            .dispatcher()
            .on_form_submitted(USER, callback_id, &fields)
            .await
    }
}

fn buttons(reply: &Reply) -> Vec<Button> {
    reply.buttons().cloned().collect()
}

fn button<'a>(buttons: &'a [Button], label: &str) -> &'a Button {
    buttons
        .iter()
        .find(|b| b.label.contains(label))
        .unwrap_or_else(|| panic!("no button labelled {label}: {buttons:?}"))
}

// ── scenario A ─────────────────────────────────────────────────────────

#[tokio::test]
async fn add_request_creates_a_one_hour_event_tomorrow() {
    let h = Harness::new(Vec::new());
    let response = h
        .assistant
        .handle_message(&InboundMessage::new(USER, "내일 오후 3시에 팀 회의 추가해줘"))
        .await;

    assert!(matches!(
        response.classification.intent,
        Intent::Schedule {
            action: ScheduleAction::Add,
            ..
        }
    ));
    assert!(response.reply.unwrap().is_success());

    let events = h.calendar.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].summary.contains("회의"));
    assert_eq!(events[0].start.naive_local().to_string(), "2026-03-05 15:00:00");
    assert_eq!(events[0].end.naive_local().to_string(), "2026-03-05 16:00:00");
}

// ── scenario B ─────────────────────────────────────────────────────────

#[tokio::test]
async fn ambiguous_delete_asks_and_deletes_nothing() {
    let h = Harness::with_meetings();
    let reply = h.say("오늘 회의 취소해줘").await;

    assert!(reply.is_success());
    let buttons = buttons(&reply);
    assert_eq!(buttons.len(), 3, "two candidates plus cancel");
    assert!(buttons.iter().any(|b| b.label == "취소"));
    assert_eq!(h.calendar.events().len(), 3);
    assert_eq!(h.assistant.sessions().len(), 1);
}

#[tokio::test]
async fn confirmed_delete_runs_exactly_once() {
    let h = Harness::with_meetings();
    let buttons = buttons(&h.say("오늘 회의 취소해줘").await);
    let pick = button(&buttons, "오전 회의");

    let first = h.press(pick).await;
    assert!(first.is_success(), "{first:?}");
    assert!(h.calendar.events().iter().all(|e| e.id != "evt-am"));

    let second = h.press(pick).await;
    assert_eq!(second.failure_kind(), Some(FailureKind::SessionExpired));
    assert_eq!(h.calendar.events().len(), 2);
    assert!(h.assistant.sessions().is_empty());
}

#[tokio::test]
async fn cancel_keeps_every_event() {
    let h = Harness::with_meetings();
    let buttons = buttons(&h.say("오늘 회의 취소해줘").await);

    let cancelled = h.press(button(&buttons, "취소")).await;
    assert!(cancelled.is_success());
    assert!(h.assistant.sessions().is_empty());

    let late = h.press(button(&buttons, "팀 회의")).await;
    assert_eq!(late.failure_kind(), Some(FailureKind::SessionExpired));
    assert_eq!(h.calendar.events().len(), 3);
}

#[tokio::test]
async fn sole_confident_match_is_deleted_directly() {
    let h = Harness::with_meetings();
    let reply = h.say("오늘 점심 약속 취소해줘").await;

    assert!(reply.is_success());
    assert_eq!(reply.buttons().count(), 0);
    assert!(h.assistant.sessions().is_empty());
    assert!(h.calendar.events().iter().all(|e| e.id != "evt-lunch"));
}

#[tokio::test]
async fn unmatched_delete_echoes_the_keyword() {
    let h = Harness::with_meetings();
    let reply = h.say("오늘 치과 일정 삭제해줘").await;

    assert_eq!(reply.failure_kind(), Some(FailureKind::NoMatch));
    assert!(reply.message.contains("'치과'"));
    assert_eq!(h.calendar.events().len(), 3);
}

#[tokio::test]
async fn another_user_cannot_consume_the_session() {
    let h = Harness::with_meetings();
    let buttons = buttons(&h.say("오늘 회의 취소해줘").await);
    let pick = button(&buttons, "팀 회의");

    let stranger = h.press_as("U2", pick).await;
    assert_eq!(stranger.failure_kind(), Some(FailureKind::SessionExpired));
    assert_eq!(h.calendar.events().len(), 3);

    assert!(h.press(pick).await.is_success());
}

#[tokio::test]
async fn backend_failure_keeps_the_session_for_a_retry() {
    let h = Harness::with_meetings();
    let buttons = buttons(&h.say("오늘 회의 취소해줘").await);
    let pick = button(&buttons, "팀 회의");

    h.calendar.set_failing(true);
    let failed = h.press(pick).await;
    assert_eq!(failed.failure_kind(), Some(FailureKind::Backend));
    assert!(failed.message.contains("처리 중 오류"));

    h.calendar.set_failing(false);
    assert!(h.press(pick).await.is_success());
    assert!(h.calendar.events().iter().all(|e| e.id != "evt-team"));
}

#[tokio::test]
async fn unreadable_callback_reads_as_expired() {
    let h = Harness::with_meetings();
    let reply = h
        .assistant
        .dispatcher()
        .on_button_activated(USER, "schedule_delete:nope")
        .await;
    assert_eq!(reply.failure_kind(), Some(FailureKind::SessionExpired));
}

#[tokio::test]
async fn outside_payload_is_never_consumed() {
    let h = Harness::with_meetings();
    let sessions = h.assistant.sessions();
    sessions.put(
        "U1:drive-1",
        USER,
        SessionPayload::Raw(serde_json::json!({ "files": ["계획서.pdf"] })),
        Duration::from_secs(600),
    );

    for action in ["schedule_delete", "schedule_cancel", "schedule_edit", "task_complete", "task_cancel"] {
        let reply = h
            .assistant
            .dispatcher()
            .on_button_activated(USER, &format!("{action}:U1:drive-1:0"))
            .await;
        assert_eq!(reply.failure_kind(), Some(FailureKind::SessionExpired), "{action}");
    }

    assert!(matches!(sessions.get("U1:drive-1", USER), Ok(SessionPayload::Raw(_))));
    assert_eq!(h.calendar.events().len(), 3);
}

// ── query, expiry ──────────────────────────────────────────────────────

#[tokio::test]
async fn listing_offers_edit_and_delete_per_event() {
    let h = Harness::with_meetings();
    let reply = h.say("오늘 일정 알려줘").await;

    assert!(reply.is_success());
    assert_eq!(reply.buttons().count(), 6);
    assert!(reply.message.contains("점심 약속"));
}

#[tokio::test]
async fn empty_listing_opens_no_session() {
    let h = Harness::new(Vec::new());
    let reply = h.say("내일 일정 알려줘").await;

    assert!(reply.is_success());
    assert!(reply.message.contains("일정이 없습니다"));
    assert!(h.assistant.sessions().is_empty());
}

#[tokio::test]
async fn expired_listing_cannot_delete() {
    let h = Harness::with_meetings();
    let buttons = buttons(&h.say("오늘 일정 알려줘").await);
    let delete = button(&buttons, "1번 삭제");

    h.clock.advance(Duration::from_secs(31 * 60));
    let reply = h.press(delete).await;
    assert_eq!(reply.failure_kind(), Some(FailureKind::SessionExpired));
    assert_eq!(h.calendar.events().len(), 3);
}

#[tokio::test]
async fn weekend_query_covers_saturday_and_sunday_only() {
    let h = Harness::new(vec![
        event("evt-wed", "팀 회의", "2026-03-04T14:00:00+09:00", 60),
        event("evt-sat", "등산", "2026-03-07T08:00:00+09:00", 240),
    ]);
    let reply = h.say("이번 주말 일정 알려줘").await;

    assert!(reply.is_success());
    assert!(reply.message.contains("03/07 ~ 03/08"), "{}", reply.message);
    assert!(reply.message.contains("등산"));
    assert!(!reply.message.contains("팀 회의"));
}

// ── update ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_goes_through_a_validated_form() {
    let h = Harness::with_meetings();
    let found = h.say("오늘 팀 회의 변경해줘").await;
    assert!(found.is_success());
    assert!(h.calendar.events().iter().any(|e| e.id == "evt-team"));

    let buttons = buttons(&found);
    let form_reply = h.press(button(&buttons, "팀 회의")).await;
    let form = form_reply.form().expect("edit form").clone();
    assert_eq!(form.field("date").unwrap().value, "2026-03-04");

    let rejected = h
        .submit(&form.callback_id, &[("title", ""), ("date", "2026/03/06"), ("time", "9시")])
        .await;
    assert_eq!(rejected.failure_kind(), Some(FailureKind::Validation));
    assert_eq!(h.assistant.sessions().len(), 1, "a bad form keeps the session");

    let accepted = h
        .submit(&form.callback_id, &[("title", ""), ("date", "2026-03-06"), ("time", "오후 4시")])
        .await;
    assert!(accepted.is_success(), "{accepted:?}");
    assert!(h.assistant.sessions().is_empty());

    let moved = h
        .calendar
        .events()
        .into_iter()
        .find(|e| e.id == "evt-team")
        .unwrap();
    assert_eq!(moved.summary, "팀 회의");
    assert_eq!(moved.start.naive_local().to_string(), "2026-03-06 16:00:00");
    assert_eq!(moved.end.naive_local().to_string(), "2026-03-06 17:00:00");
}

#[tokio::test]
async fn empty_time_makes_the_event_all_day() {
    let h = Harness::with_meetings();
    let buttons = buttons(&h.say("오늘 일정 알려줘").await);
    let form = h
        .press(button(&buttons, "1번 수정"))
        .await
        .form()
        .expect("edit form")
        .clone();

    let reply = h
        .submit(&form.callback_id, &[("title", "워크숍"), ("date", "2026-03-07"), ("time", "")])
        .await;
    assert!(reply.is_success());
    assert!(h.calendar.events().iter().any(|e| e.summary == "워크숍" && e.is_all_day()));
}

// ── scenario C and other task flows ───────────────────────────────────

#[tokio::test]
async fn single_confident_task_is_completed_immediately() {
    let h = Harness::new(Vec::new());
    let list = h.tasks.default_list_id().unwrap();
    h.tasks.seed(&list, "운동하기", TaskStatus::NeedsAction);
    h.tasks.seed(&list, "보고서 작성", TaskStatus::NeedsAction);
    h.tasks.seed(&list, "우유 사기", TaskStatus::NeedsAction);

    let response = h
        .assistant
        .handle_message(&InboundMessage::new(USER, "운동하기 완료 처리해줘"))
        .await;
    assert_eq!(response.classification.category(), Category::Task);
    assert!(response.reply.unwrap().is_success());

    assert!(h.assistant.sessions().is_empty());
    let done: Vec<_> = h.tasks.tasks().into_iter().filter(|t| t.is_completed()).collect();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].title, "운동하기");
}

#[tokio::test]
async fn task_listing_shrinks_in_place() {
    let h = Harness::new(Vec::new());
    let list = h.tasks.default_list_id().unwrap();
    for title in ["장보기", "세탁소 들르기", "책 반납"] {
        h.tasks.seed(&list, title, TaskStatus::NeedsAction);
    }

    let listing = h.say("할일 목록 보여줘").await;
    let first = buttons(&listing);
    assert_eq!(first.len(), 3);

    let after = h.press(button(&first, "세탁소")).await;
    assert!(after.is_success());
    let second = buttons(&after);
    assert_eq!(second.len(), 2);
    assert!(second.iter().all(|b| !b.label.contains("세탁소")));
    assert_eq!(h.assistant.sessions().len(), 1);

    assert!(h.press(button(&second, "책 반납")).await.is_success());
    let last = h.press(button(&second, "장보기")).await;
    assert!(last.is_success(), "{last:?}");
    assert!(h.assistant.sessions().is_empty());
    assert!(h.tasks.tasks().iter().all(|t| t.is_completed()));
}

#[tokio::test]
async fn repeated_listing_press_completes_nothing_else() {
    let h = Harness::new(Vec::new());
    let list = h.tasks.default_list_id().unwrap();
    for title in ["장보기", "세탁소 들르기", "책 반납"] {
        h.tasks.seed(&list, title, TaskStatus::NeedsAction);
    }

    let first = buttons(&h.say("할일 목록 보여줘").await);
    let groceries = button(&first, "장보기");

    assert!(h.press(groceries).await.is_success());
    let again = h.press(groceries).await;
    assert_eq!(again.failure_kind(), Some(FailureKind::SessionExpired));

    let done: Vec<String> = h
        .tasks
        .tasks()
        .into_iter()
        .filter(|t| t.is_completed())
        .map(|t| t.title)
        .collect();
    assert_eq!(done, ["장보기"]);

    // Buttons from the original listing still point at their own task.
    let books = h.press(button(&first, "책 반납")).await;
    assert!(books.message.contains("책 반납"), "{books:?}");
    assert!(
        h.tasks
            .tasks()
            .iter()
            .any(|t| t.title == "세탁소 들르기" && !t.is_completed())
    );
}

#[tokio::test]
async fn multi_task_add_reports_partial_failure() {
    let h = Harness::new(Vec::new());
    h.tasks.reject_title("보고서 작성");

    let reply = h.say("할일 추가해줘\n- 우유 사기\n- 보고서 작성\n- 운동하기").await;
    assert!(reply.is_success());
    assert!(reply.message.contains("2개"));
    assert!(reply.message.contains("추가하지 못한 항목: 보고서 작성"));

    let titles: Vec<String> = h.tasks.tasks().into_iter().map(|t| t.title).collect();
    assert!(titles.contains(&"우유 사기".to_string()));
    assert!(titles.contains(&"운동하기".to_string()));
    assert!(!titles.contains(&"보고서 작성".to_string()));
}

// ── scenario D ─────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_model_answer_collapses_to_general() {
    let assistant = Assistant::builder(Arc::new(MemoryCalendar::new()), Arc::new(MemoryTasks::new()))
        .model(Arc::new(Scripted("죄송해요, 잘 모르겠어요")))
        .build()
        .unwrap();

    let response = assistant
        .handle_message(&InboundMessage::new(USER, "오늘 기분이 어때?"))
        .await;
    assert_eq!(response.classification.intent, Intent::General);
    assert_eq!(response.classification.source, ClassificationSource::Fallback);
    assert!(response.reply.is_none());
}
