//! Records exchanged with calendar and task backends.
//!
//! Field names follow the Google Calendar v3 and Google Tasks v1 wire
//! formats so the REST adapters can (de)serialize them directly.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// Start or end of an event: an instant, or a whole date for all-day events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    DateTime {
        #[serde(rename = "dateTime")]
        date_time: DateTime<FixedOffset>,
    },
    Date {
        date: NaiveDate,
    },
}

impl EventTime {
    pub fn timed(date_time: DateTime<FixedOffset>) -> Self {
        Self::DateTime { date_time }
    }

    pub fn all_day(date: NaiveDate) -> Self {
        Self::Date { date }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::Date { .. })
    }

    /// Calendar date in the event's own offset.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::DateTime { date_time } => date_time.date_naive(),
            Self::Date { date } => *date,
        }
    }

    /// Wall-clock time, `None` for all-day values.
    pub fn time(&self) -> Option<NaiveTime> {
        match self {
            Self::DateTime { date_time } => Some(date_time.time()),
            Self::Date { .. } => None,
        }
    }

    /// Local wall-clock value; all-day values map to midnight.
    pub fn naive_local(&self) -> NaiveDateTime {
        match self {
            Self::DateTime { date_time } => date_time.naive_local(),
            Self::Date { date } => date.and_time(NaiveTime::MIN),
        }
    }

    /// Absolute instant, interpreting all-day values as midnight in `tz`.
    pub fn instant(&self, tz: FixedOffset) -> DateTime<FixedOffset> {
        match self {
            Self::DateTime { date_time } => *date_time,
            Self::Date { date } => midnight(*date, tz),
        }
    }
}

/// Midnight of `date` in `tz`.
pub fn midnight(date: NaiveDate, tz: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(NaiveTime::MIN);
    let utc = local - TimeDelta::seconds(i64::from(tz.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, tz)
}

/// A calendar event as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
}

impl CalendarEvent {
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day()
    }

    /// Whether the event overlaps the half-open window `[start, end)`.
    pub fn overlaps(&self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> bool {
        let tz = *start.offset();
        self.start.instant(tz) < end && self.end.instant(tz) > start
    }

    /// Text used for fuzzy matching: summary plus description.
    pub fn search_text(&self) -> String {
        match &self.description {
            Some(desc) if !desc.trim().is_empty() => format!("{} {}", self.summary, desc),
            _ => self.summary.clone(),
        }
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start.time(), self.end.time()) {
            (Some(start), Some(end)) => write!(
                f,
                "{} {}~{} {}",
                self.start.date().format("%m/%d"),
                start.format("%H:%M"),
                end.format("%H:%M"),
                self.summary
            ),
            _ => write!(
                f,
                "{} (종일) {}",
                self.start.date().format("%m/%d"),
                self.summary
            ),
        }
    }
}

/// An event that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// A named list of tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    #[default]
    NeedsAction,
    Completed,
}

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<FixedOffset>>,
    /// Owning list.  Not part of the Google payload; filled in by the backend.
    #[serde(default, skip_serializing)]
    pub list_id: String,
}

impl TaskItem {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// A task that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskDraft {
    pub title: String,
    pub notes: Option<String>,
    pub due: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn event_time_prefers_date_time() {
        let timed: EventTime = serde_json::from_value(json!({
            "dateTime": "2026-03-02T10:00:00+09:00",
            "timeZone": "Asia/Seoul"
        }))
        .unwrap();
        assert!(!timed.is_all_day());
        assert_eq!(timed.time(), NaiveTime::from_hms_opt(10, 0, 0));

        let all_day: EventTime = serde_json::from_value(json!({"date": "2026-03-02"})).unwrap();
        assert!(all_day.is_all_day());
        assert_eq!(all_day.date(), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn event_time_serializes_google_shape() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let value = serde_json::to_value(EventTime::all_day(date)).unwrap();
        assert_eq!(value, json!({"date": "2026-03-02"}));
    }

    #[test]
    fn midnight_respects_offset() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let at = midnight(date, kst());
        assert_eq!(at.to_rfc3339(), "2026-03-02T00:00:00+09:00");
    }

    #[test]
    fn overlap_is_half_open() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let event = CalendarEvent {
            id: "e1".into(),
            summary: "종일".into(),
            description: None,
            start: EventTime::all_day(date),
            end: EventTime::all_day(date.succ_opt().unwrap()),
        };
        let day = midnight(date, kst());
        let next = midnight(date.succ_opt().unwrap(), kst());
        assert!(event.overlaps(day, next));
        assert!(!event.overlaps(next, next + TimeDelta::days(1)));
    }

    #[test]
    fn task_status_wire_names() {
        assert_eq!(
            serde_json::to_value(TaskStatus::NeedsAction).unwrap(),
            json!("needsAction")
        );
        let task: TaskItem = serde_json::from_value(json!({
            "id": "t1",
            "title": "우유 사기",
            "status": "completed"
        }))
        .unwrap();
        assert!(task.is_completed());
        assert!(task.list_id.is_empty());
    }
}
