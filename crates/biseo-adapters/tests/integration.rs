//! Integration tests for the Google REST backends against a mock server.

use std::time::Duration;

use biseo_adapters::{
    AdapterError, CalendarBackend, EventDraft, EventTime, GoogleCalendar, GoogleTasks,
    TaskBackend, TaskDraft, TaskStatus,
};
use chrono::{DateTime, NaiveDate};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";

fn calendar(server: &MockServer) -> GoogleCalendar {
    GoogleCalendar::new(&server.uri(), "primary", TOKEN, Duration::from_secs(5)).unwrap()
}

fn tasks(server: &MockServer) -> GoogleTasks {
    GoogleTasks::new(&server.uri(), TOKEN, Duration::from_secs(5)).unwrap()
}

fn window() -> (DateTime<chrono::FixedOffset>, DateTime<chrono::FixedOffset>) {
    (
        DateTime::parse_from_rfc3339("2026-03-02T00:00:00+09:00").unwrap(),
        DateTime::parse_from_rfc3339("2026-03-09T00:00:00+09:00").unwrap(),
    )
}

// ═══════════════════════════════════════════════════════════════════════
//  Calendar
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn list_events_decodes_timed_and_all_day() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendars/primary/events"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("singleEvents", "true"))
        .and(query_param("timeMin", "2026-03-02T00:00:00+09:00"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "e1",
                    "summary": "팀 회의",
                    "start": { "dateTime": "2026-03-02T10:00:00+09:00" },
                    "end": { "dateTime": "2026-03-02T11:00:00+09:00" }
                },
                {
                    "id": "e2",
                    "summary": "휴가",
                    "start": { "date": "2026-03-05" },
                    "end": { "date": "2026-03-06" }
                }
            ]
        })))
        .mount(&server)
        .await;

    let (start, end) = window();
    let events = calendar(&server).list_events(start, end).await.unwrap();
    assert_eq!(events.len(), 2);
    assert!(!events[0].is_all_day());
    assert!(events[1].is_all_day());
    assert_eq!(
        events[1].start.date(),
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()
    );
}

#[tokio::test]
async fn empty_page_has_no_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "kind": "calendar#events" })))
        .mount(&server)
        .await;

    let (start, end) = window();
    let events = calendar(&server)
        .search_events("회의", start, end)
        .await
        .unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn insert_event_posts_google_shape() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(body_partial_json(json!({
            "summary": "치과",
            "start": { "date": "2026-03-04" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-1",
            "summary": "치과",
            "start": { "date": "2026-03-04" },
            "end": { "date": "2026-03-05" }
        })))
        .mount(&server)
        .await;

    let date = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
    let draft = EventDraft {
        summary: "치과".into(),
        description: None,
        start: EventTime::all_day(date),
        end: EventTime::all_day(date.succ_opt().unwrap()),
    };
    let event = calendar(&server).insert_event(&draft).await.unwrap();
    assert_eq!(event.id, "new-1");
}

#[tokio::test]
async fn delete_missing_event_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/calendars/primary/events/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let err = calendar(&server).delete_event("gone").await.unwrap_err();
    assert!(matches!(err, AdapterError::NotFound { .. }));
}

#[tokio::test]
async fn server_error_carries_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let err = calendar(&server).delete_event("e1").await.unwrap_err();
    match err {
        AdapterError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "try later");
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tasks
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn list_tasks_tags_items_with_list_and_drops_completed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lists/L1/tasks"))
        .and(query_param("showCompleted", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "t1", "title": "보고서 제출", "status": "needsAction" },
                { "id": "t2", "title": "장보기", "status": "completed" }
            ]
        })))
        .mount(&server)
        .await;

    let items = tasks(&server).list_tasks("L1", false).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].list_id, "L1");
}

#[tokio::test]
async fn list_task_lists_reads_me_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/@me/lists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "L1", "title": "기본" }, { "id": "L2", "title": "업무" }]
        })))
        .mount(&server)
        .await;

    let lists = tasks(&server).list_task_lists().await.unwrap();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[1].title, "업무");
}

#[tokio::test]
async fn insert_and_complete_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/lists/L1/tasks"))
        .and(body_partial_json(json!({ "title": "우유 사기" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t9", "title": "우유 사기", "status": "needsAction"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/lists/L1/tasks/t9"))
        .and(body_partial_json(json!({ "status": "completed" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "t9", "title": "우유 사기", "status": "completed"
        })))
        .mount(&server)
        .await;

    let backend = tasks(&server);
    let created = backend
        .insert_task("L1", &TaskDraft::titled("우유 사기"))
        .await
        .unwrap();
    assert_eq!(created.status, TaskStatus::NeedsAction);

    let done = backend
        .patch_task_status("L1", &created.id, TaskStatus::Completed)
        .await
        .unwrap();
    assert!(done.is_completed());
    assert_eq!(done.list_id, "L1");
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = tasks(&server).list_task_lists().await.unwrap_err();
    assert!(matches!(err, AdapterError::InvalidResponse(_)));
}
