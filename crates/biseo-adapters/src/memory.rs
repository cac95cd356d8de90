//! In-process calendar and task backends.
//!
//! Used by the CLI's offline mode and by tests.  Both can be switched into a
//! failing state to exercise backend-error paths.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::calendar::CalendarBackend;
use crate::error::{AdapterError, Result};
use crate::tasks::TaskBackend;
use crate::types::{
    CalendarEvent, EventDraft, TaskDraft, TaskItem, TaskList, TaskStatus, midnight,
};

fn new_id() -> String {
    Uuid::now_v7().simple().to_string()
}

fn check_available(failing: &AtomicBool) -> Result<()> {
    if failing.load(Ordering::SeqCst) {
        return Err(AdapterError::Unavailable("backend switched off".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// MemoryCalendar
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryCalendar {
    events: Mutex<Vec<CalendarEvent>>,
    failing: AtomicBool,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events: Mutex::new(events),
            failing: AtomicBool::new(false),
        }
    }

    /// Snapshot of every stored event.
    pub fn events(&self) -> Vec<CalendarEvent> {
        self.lock().clone()
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CalendarEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn window(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        keep: impl Fn(&CalendarEvent) -> bool,
    ) -> Vec<CalendarEvent> {
        let tz = *start.offset();
        let mut found: Vec<CalendarEvent> = self
            .lock()
            .iter()
            .filter(|event| event.overlaps(start, end) && keep(event))
            .cloned()
            .collect();
        found.sort_by_key(|event| event.start.instant(tz));
        found
    }
}

#[async_trait]
impl CalendarBackend for MemoryCalendar {
    async fn list_events(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>> {
        check_available(&self.failing)?;
        Ok(self.window(start, end, |_| true))
    }

    async fn search_events(
        &self,
        query: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<CalendarEvent>> {
        check_available(&self.failing)?;
        let needle = query.trim().to_lowercase();
        Ok(self.window(start, end, |event| {
            event.search_text().to_lowercase().contains(&needle)
        }))
    }

    async fn insert_event(&self, draft: &EventDraft) -> Result<CalendarEvent> {
        check_available(&self.failing)?;
        let event = CalendarEvent {
            id: new_id(),
            summary: draft.summary.clone(),
            description: draft.description.clone(),
            start: draft.start,
            end: draft.end,
        };
        self.lock().push(event.clone());
        debug!(event_id = %event.id, "memory event inserted");
        Ok(event)
    }

    async fn update_event(&self, event: &CalendarEvent) -> Result<CalendarEvent> {
        check_available(&self.failing)?;
        let mut events = self.lock();
        let slot = events
            .iter_mut()
            .find(|stored| stored.id == event.id)
            .ok_or_else(|| AdapterError::NotFound {
                resource: format!("calendar event {}", event.id),
            })?;
        *slot = event.clone();
        Ok(event.clone())
    }

    async fn delete_event(&self, event_id: &str) -> Result<()> {
        check_available(&self.failing)?;
        let mut events = self.lock();
        let before = events.len();
        events.retain(|event| event.id != event_id);
        if events.len() == before {
            return Err(AdapterError::NotFound {
                resource: format!("calendar event {event_id}"),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryTasks
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TaskState {
    lists: Vec<TaskList>,
    tasks: Vec<TaskItem>,
}

#[derive(Debug, Default)]
pub struct MemoryTasks {
    state: Mutex<TaskState>,
    failing: AtomicBool,
    /// Titles whose insertion should fail, for partial-failure scenarios.
    rejected_titles: Mutex<Vec<String>>,
}

impl MemoryTasks {
    /// A backend with a single default list.
    pub fn new() -> Self {
        let backend = Self::default();
        backend.add_list("내 할 일");
        backend
    }

    /// Add a list and return its id.
    pub fn add_list(&self, title: &str) -> String {
        let id = new_id();
        self.lock().lists.push(TaskList {
            id: id.clone(),
            title: title.to_string(),
        });
        id
    }

    /// Add a task to `list_id` directly, bypassing failure injection.
    pub fn seed(&self, list_id: &str, title: &str, status: TaskStatus) -> TaskItem {
        let task = TaskItem {
            id: new_id(),
            title: title.to_string(),
            status,
            due: None,
            list_id: list_id.to_string(),
        };
        self.lock().tasks.push(task.clone());
        task
    }

    /// Id of the first list, if any.
    pub fn default_list_id(&self) -> Option<String> {
        self.lock().lists.first().map(|list| list.id.clone())
    }

    pub fn tasks(&self) -> Vec<TaskItem> {
        self.lock().tasks.clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make `insert_task` fail for this exact title.
    pub fn reject_title(&self, title: &str) {
        self.rejected_titles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(title.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn has_list(state: &TaskState, list_id: &str) -> Result<()> {
        if state.lists.iter().any(|list| list.id == list_id) {
            Ok(())
        } else {
            Err(AdapterError::NotFound {
                resource: format!("task list {list_id}"),
            })
        }
    }
}

#[async_trait]
impl TaskBackend for MemoryTasks {
    async fn list_task_lists(&self) -> Result<Vec<TaskList>> {
        check_available(&self.failing)?;
        Ok(self.lock().lists.clone())
    }

    async fn list_tasks(&self, list_id: &str, show_completed: bool) -> Result<Vec<TaskItem>> {
        check_available(&self.failing)?;
        let state = self.lock();
        Self::has_list(&state, list_id)?;
        Ok(state
            .tasks
            .iter()
            .filter(|task| task.list_id == list_id && (show_completed || !task.is_completed()))
            .cloned()
            .collect())
    }

    async fn insert_task(&self, list_id: &str, draft: &TaskDraft) -> Result<TaskItem> {
        check_available(&self.failing)?;
        let rejected = self
            .rejected_titles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|title| title == &draft.title);
        if rejected {
            return Err(AdapterError::Status {
                status: 400,
                body: format!("rejected title `{}`", draft.title),
            });
        }

        let mut state = self.lock();
        Self::has_list(&state, list_id)?;
        let task = TaskItem {
            id: new_id(),
            title: draft.title.clone(),
            status: TaskStatus::NeedsAction,
            due: draft.due.map(|date| midnight(date, Utc.fix())),
            list_id: list_id.to_string(),
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn patch_task_status(
        &self,
        list_id: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<TaskItem> {
        check_available(&self.failing)?;
        let mut state = self.lock();
        let task = state
            .tasks
            .iter_mut()
            .find(|task| task.list_id == list_id && task.id == task_id)
            .ok_or_else(|| AdapterError::NotFound {
                resource: format!("task {task_id}"),
            })?;
        task.status = status;
        Ok(task.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventTime;
    use chrono::{NaiveDate, TimeDelta};

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn draft(summary: &str, day: u32, hour: u32) -> EventDraft {
        let date = NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
        let start = midnight(date, kst()) + TimeDelta::hours(i64::from(hour));
        EventDraft {
            summary: summary.into(),
            description: None,
            start: EventTime::timed(start),
            end: EventTime::timed(start + TimeDelta::hours(1)),
        }
    }

    #[tokio::test]
    async fn list_filters_window_and_sorts() {
        let calendar = MemoryCalendar::new();
        calendar.insert_event(&draft("늦은 회의", 2, 15)).await.unwrap();
        calendar.insert_event(&draft("이른 회의", 2, 9)).await.unwrap();
        calendar.insert_event(&draft("다음날", 3, 9)).await.unwrap();

        let day = midnight(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(), kst());
        let events = calendar
            .list_events(day, day + TimeDelta::days(1))
            .await
            .unwrap();
        let titles: Vec<_> = events.iter().map(|e| e.summary.as_str()).collect();
        assert_eq!(titles, vec!["이른 회의", "늦은 회의"]);
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let calendar = MemoryCalendar::new();
        assert!(matches!(
            calendar.delete_event("nope").await,
            Err(AdapterError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn failing_switch_blocks_calls() {
        let calendar = MemoryCalendar::new();
        calendar.set_failing(true);
        assert!(calendar.insert_event(&draft("x", 2, 9)).await.is_err());
        calendar.set_failing(false);
        assert!(calendar.insert_event(&draft("x", 2, 9)).await.is_ok());
    }

    #[tokio::test]
    async fn tasks_hide_completed_unless_asked() {
        let tasks = MemoryTasks::new();
        let list = tasks.default_list_id().unwrap();
        tasks.seed(&list, "열린 일", TaskStatus::NeedsAction);
        tasks.seed(&list, "끝난 일", TaskStatus::Completed);

        assert_eq!(tasks.list_tasks(&list, false).await.unwrap().len(), 1);
        assert_eq!(tasks.list_tasks(&list, true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_title_fails_insert_only_for_that_title() {
        let tasks = MemoryTasks::new();
        let list = tasks.default_list_id().unwrap();
        tasks.reject_title("나쁜 일");
        assert!(
            tasks
                .insert_task(&list, &TaskDraft::titled("나쁜 일"))
                .await
                .is_err()
        );
        assert!(
            tasks
                .insert_task(&list, &TaskDraft::titled("좋은 일"))
                .await
                .is_ok()
        );
    }
}
